use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map as JsonMap, Value};
use serde_path_to_error as spte;

use crate::error::AnalysisError;
use crate::models::{ExerciseKind, ExerciseProfile, ProfileCatalog};

/// Legger feltene i `patch` oppå den innebygde profilen og validerer resultatet.
fn merge_profile(kind: ExerciseKind, patch: JsonMap<String, Value>) -> Result<ExerciseProfile, AnalysisError> {
    let base = serde_json::to_value(ExerciseProfile::for_exercise(kind)).map_err(|e| AnalysisError::Json {
        path: kind.as_str().to_string(),
        message: e.to_string(),
    })?;
    let mut obj = match base {
        Value::Object(m) => m,
        _ => JsonMap::new(),
    };
    for (k, v) in patch {
        obj.insert(k, v);
    }
    // Nøkkelen i katalogen bestemmer øvelsen
    obj.insert("exercise".into(), Value::from(kind.as_str()));

    let txt = Value::Object(obj).to_string();
    let mut de = serde_json::Deserializer::from_str(&txt);
    let profile: ExerciseProfile = spte::deserialize(&mut de).map_err(|e| AnalysisError::Json {
        path: format!("{}.{}", kind.as_str(), e.path()),
        message: e.inner().to_string(),
    })?;
    profile.validate()?;
    Ok(profile)
}

/// Tolker en katalog: `{ "<øvelse>": { <felt som overstyres> }, ... }`.
/// Øvelser som ikke nevnes beholder innebygde verdier.
pub fn parse_profile_catalog(json: &str) -> Result<ProfileCatalog, AnalysisError> {
    let mut de = serde_json::Deserializer::from_str(json);
    let raw: BTreeMap<String, JsonMap<String, Value>> =
        spte::deserialize(&mut de).map_err(AnalysisError::from_path_error)?;

    let mut catalog = ProfileCatalog::default();
    for (name, patch) in raw {
        let kind = ExerciseKind::parse(&name)?;
        let profile = merge_profile(kind, patch)?;
        log::debug!("profile override for {}: {:?}", kind, profile);
        catalog.insert(profile, kind);
    }
    Ok(catalog)
}

/// Leser profilkatalog fra disk (JSON).
/// Hvis filen ikke finnes, returneres den innebygde katalogen.
pub fn load_profile_catalog<P: AsRef<Path>>(path: P) -> Result<ProfileCatalog, AnalysisError> {
    let path = path.as_ref();
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let catalog = parse_profile_catalog(&contents)?;
        log::info!(
            "profile catalog loaded from {} ({} profiles)",
            path.display(),
            catalog.profiles.len()
        );
        Ok(catalog)
    } else {
        log::warn!(
            "profile catalog not found at {}, using built-in profiles",
            path.display()
        );
        Ok(ProfileCatalog::default())
    }
}

/// Lagrer katalogen til disk som JSON (pretty-print), nøklet på øvelsesnavn.
pub fn save_profile_catalog<P: AsRef<Path>>(catalog: &ProfileCatalog, path: P) -> Result<(), AnalysisError> {
    let path = path.as_ref();
    let by_name: BTreeMap<&str, &ExerciseProfile> =
        catalog.profiles.iter().map(|(k, p)| (k.as_str(), p)).collect();
    let json = serde_json::to_string_pretty(&by_name).map_err(|e| AnalysisError::Json {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json)?;
    log::info!(
        "profile catalog saved to {} ({} profiles)",
        path.display(),
        by_name.len()
    );
    Ok(())
}
