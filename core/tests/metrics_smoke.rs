mod common;

use common::curl_session;
use liftgraph_core::models::builtin_profile;
use liftgraph_core::{analyze_session, AnalysisConfig, AnalyzeInputs, ExerciseKind, Metrics};

#[test]
fn smoke_counters_follow_sessions() {
    let metrics = Metrics::new().expect("metrics");
    let config = AnalysisConfig::default();
    let profile = builtin_profile(ExerciseKind::ConcentrationCurls);

    let run = |samples: &[liftgraph_core::SensorSample]| {
        analyze_session(AnalyzeInputs {
            samples,
            profile,
            config: &config,
            meta: None,
            metrics: Some(&metrics),
        })
    };

    run(&curl_session(4));
    run(&curl_session(2));
    run(&[]);

    assert_eq!(metrics.sessions_total(), 3);
    assert_eq!(metrics.reps_total(), 6);
    assert_eq!(metrics.strategy_total("normal"), 2);
    assert_eq!(metrics.strategy_total("degenerate"), 1);
    // 2 reps og tom økt
    assert_eq!(metrics.insufficient_fatigue_total(), 2);

    let txt = metrics.gather_text();
    assert!(txt.contains("liftgraph_sessions_total 3"));
    assert!(txt.contains("liftgraph_segmentation_strategy_total{strategy=\"normal\"} 2"));
}

#[test]
fn registries_are_independent() {
    let a = Metrics::new().unwrap();
    let b = Metrics::new().unwrap();
    a.record_session("normal", 3, false);
    assert_eq!(a.sessions_total(), 1);
    assert_eq!(b.sessions_total(), 0);
}
