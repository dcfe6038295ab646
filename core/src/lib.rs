pub mod error;
pub mod types;
pub mod models;

pub mod smoothing;
pub mod peaks;
pub mod segmentation;
pub mod stats;
pub mod features;
pub mod fatigue;
pub mod analyzer;

pub mod metrics;
pub mod storage;
pub mod cli;

#[cfg(feature = "python")]
mod py;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_path_to_error as spte;

pub use error::{AnalysisError, Outcome, Status};
pub use types::{
    Axis, Channel, ChannelStats, FatigueLevel, GyroDirection, PhaseSplit, RepFeatureSet, RepSegment,
    Segmentation, SegmentationStrategy, SensorSample, SessionFatigueReport, SessionMeta,
};
pub use models::{
    AnalysisConfig, Equipment, ExerciseKind, ExerciseProfile, FatigueParams, ProfileCatalog,
};
pub use analyzer::{analyze_session, AnalyzeInputs, RepAnalysis, SessionAnalysis, SessionSummary};
pub use fatigue::compute_fatigue;
pub use features::{extract_rep_features, model_feature_names};
pub use segmentation::segment_session;
pub use metrics::Metrics;

// ──────────────────────────────────────────────────────────────────────────────
// JSON-INNGANG (brukes av Python-bindingen og CLI)
// ──────────────────────────────────────────────────────────────────────────────

/// `{ samples, exercise?, source_name?, profile?, config?, session_id?, start_time_utc? }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeRequest {
    pub samples: Vec<SensorSample>,
    #[serde(default)]
    pub exercise: Option<String>,
    /// Filnavn e.l. – brukes til å gjenkjenne øvelsen når `exercise` mangler
    #[serde(default, alias = "sourceName")]
    pub source_name: Option<String>,
    /// Full profil, overstyrer katalogen
    #[serde(default)]
    pub profile: Option<ExerciseProfile>,
    #[serde(default)]
    pub config: Option<AnalysisConfig>,
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    #[serde(default, alias = "startTimeUtc")]
    pub start_time_utc: Option<DateTime<Utc>>,
}

impl AnalyzeRequest {
    /// Eksplisitt navn > kildenavn > profilens øvelse > Unknown.
    pub fn exercise_kind(&self) -> Result<ExerciseKind, AnalysisError> {
        if let Some(name) = &self.exercise {
            return ExerciseKind::parse(name);
        }
        if let Some(src) = &self.source_name {
            let kind = ExerciseKind::from_source_name(src);
            if kind != ExerciseKind::Unknown {
                return Ok(kind);
            }
        }
        Ok(self.profile.as_ref().map(|p| p.exercise).unwrap_or(ExerciseKind::Unknown))
    }

    pub fn resolve_profile(&self, catalog: &ProfileCatalog) -> Result<ExerciseProfile, AnalysisError> {
        match &self.profile {
            Some(p) => {
                p.validate()?;
                Ok(p.clone())
            }
            None => Ok(catalog.get(self.exercise_kind()?)),
        }
    }

    pub fn meta(&self) -> Result<SessionMeta, AnalysisError> {
        Ok(SessionMeta {
            session_id: self.session_id.clone(),
            exercise: Some(self.exercise_kind()?),
            start_time_utc: self.start_time_utc,
        })
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, AnalysisError> {
    let mut de = serde_json::Deserializer::from_str(json);
    spte::deserialize(&mut de).map_err(AnalysisError::from_path_error)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AnalysisError> {
    serde_json::to_string(value).map_err(|e| AnalysisError::Json {
        path: "<output>".to_string(),
        message: e.to_string(),
    })
}

/// Kjører hele analysen for en forespørsel mot gitt katalog.
pub fn analyze_request(
    req: &AnalyzeRequest,
    catalog: &ProfileCatalog,
    metrics: Option<&Metrics>,
) -> Result<SessionAnalysis, AnalysisError> {
    let profile = req.resolve_profile(catalog)?;
    let config = req.config.clone().unwrap_or_default();
    let meta = req.meta()?;
    Ok(analyze_session(AnalyzeInputs {
        samples: &req.samples,
        profile: &profile,
        config: &config,
        meta: Some(&meta),
        metrics,
    }))
}

/// JSON inn → `SessionAnalysis` som JSON ut. Innebygde profiler.
pub fn analyze_session_json(json: &str) -> Result<String, AnalysisError> {
    let req: AnalyzeRequest = parse_json(json)?;
    let analysis = analyze_request(&req, &ProfileCatalog::default(), None)?;
    to_json(&analysis)
}

/// Kun segmentering. Samme forespørselsform som `analyze_session_json`.
pub fn segment_session_json(json: &str) -> Result<String, AnalysisError> {
    let req: AnalyzeRequest = parse_json(json)?;
    let profile = req.resolve_profile(&ProfileCatalog::default())?;
    to_json(&segment_session(&req.samples, &profile))
}

#[derive(Debug, Deserialize)]
struct FatigueRequest {
    reps: Vec<RepFeatureSet>,
    #[serde(default)]
    params: Option<FatigueParams>,
}

/// `{ reps: [RepFeatureSet…], params? }` → tretthetsrapport som JSON.
/// Rep-feltene er valgfrie; manglende verdier tolkes som 0.
pub fn compute_fatigue_json(json: &str) -> Result<String, AnalysisError> {
    let req: FatigueRequest = parse_json(json)?;
    let params = req.params.unwrap_or_default();
    to_json(&compute_fatigue(&req.reps, &params))
}

#[derive(Debug, Serialize)]
struct CatalogEntry<'a> {
    exercise: ExerciseKind,
    equipment: Equipment,
    quality_labels: [&'static str; 3],
    profile: &'a ExerciseProfile,
}

/// Innebygde øvelser med utstyr, kvalitetsklasser og profil.
pub fn exercise_catalog_json() -> Result<String, AnalysisError> {
    let catalog = ProfileCatalog::default();
    let entries: Vec<CatalogEntry> = catalog
        .profiles
        .iter()
        .map(|(kind, profile)| CatalogEntry {
            exercise: *kind,
            equipment: kind.equipment(),
            quality_labels: kind.equipment().quality_labels(),
            profile,
        })
        .collect();
    to_json(&entries)
}
