use liftgraph_core::storage::{load_profile_catalog, parse_profile_catalog, save_profile_catalog};
use liftgraph_core::{AnalysisError, ExerciseKind, ProfileCatalog};
use std::fs;
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("liftgraph_{}_{}.json", name, std::process::id()))
}

#[test]
fn override_keeps_unmentioned_fields() {
    let json = r#"{ "bench press": { "min_rep_duration_ms": 1400.0, "smoothing_window": 15 } }"#;
    let catalog = parse_profile_catalog(json).expect("parse");

    let bench = catalog.get(ExerciseKind::BenchPress);
    assert_eq!(bench.exercise, ExerciseKind::BenchPress);
    assert_eq!(bench.min_rep_duration_ms, 1400.0);
    assert_eq!(bench.smoothing_window, 15);
    // uendret fra innebygd profil
    assert_eq!(bench.max_rep_duration_ms, 10000.0);

    // andre øvelser er urørt
    assert_eq!(
        catalog.get(ExerciseKind::BackSquat),
        ProfileCatalog::default().get(ExerciseKind::BackSquat)
    );
}

#[test]
fn save_and_load_catalog() {
    let path = tmp_path("roundtrip");
    let _ = fs::remove_file(&path);

    let mut catalog = ProfileCatalog::default();
    let mut squat = catalog.get(ExerciseKind::BackSquat);
    squat.prominence_factor = 0.2;
    catalog.insert(squat, ExerciseKind::BackSquat);

    save_profile_catalog(&catalog, &path).expect("save_profile_catalog failed");
    let loaded = load_profile_catalog(&path).expect("load_profile_catalog failed");

    assert_eq!(loaded, catalog);
    assert_eq!(loaded.get(ExerciseKind::BackSquat).prominence_factor, 0.2);

    let _ = fs::remove_file(&path);
}

#[test]
fn missing_file_gives_builtin_catalog() {
    let path = tmp_path("does_not_exist");
    let _ = fs::remove_file(&path);
    let loaded = load_profile_catalog(&path).expect("load");
    assert_eq!(loaded, ProfileCatalog::default());
}

#[test]
fn invalid_override_is_rejected() {
    let json = r#"{ "BACK_SQUAT": { "min_rep_duration_ms": 20000.0 } }"#;
    match parse_profile_catalog(json) {
        Err(AnalysisError::InvalidProfile { exercise, .. }) => assert_eq!(exercise, "BACK_SQUAT"),
        other => panic!("expected InvalidProfile, got {:?}", other),
    }

    let json = r#"{ "deadlift": {} }"#;
    assert!(matches!(
        parse_profile_catalog(json),
        Err(AnalysisError::UnknownExercise(_))
    ));

    // feil type → sti til feltet
    let json = r#"{ "BENCH_PRESS": { "std_factor": "high" } }"#;
    match parse_profile_catalog(json) {
        Err(AnalysisError::Json { path, .. }) => assert!(path.contains("std_factor"), "path {}", path),
        other => panic!("expected Json error, got {:?}", other),
    }
}
