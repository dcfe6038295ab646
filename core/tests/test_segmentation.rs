mod common;

use common::{curl_session, curl_session_with, ramp_session, DT_MS};
use liftgraph_core::models::builtin_profile;
use liftgraph_core::{
    segment_session, ExerciseKind, ExerciseProfile, SegmentationStrategy, SensorSample, Status,
};

fn curl_profile_with_floor(floor: f64) -> ExerciseProfile {
    ExerciseProfile {
        min_prominence_floor: floor,
        ..builtin_profile(ExerciseKind::ConcentrationCurls).clone()
    }
}

/// Langsomt løft over 7 s til første topp, deretter reps à 2400 ms med
/// daler i 8200, 10600 og 13000 ms. Første dal ligger over 8 s fra start,
/// så varighetsfilteret forkaster alle dalene; toppene passer.
fn slow_start_session() -> Vec<SensorSample> {
    use std::f64::consts::PI;
    (0..771)
        .map(|i| {
            let t = i as f64 * DT_MS;
            let u = if t <= 7000.0 {
                0.5 * (1.0 - (PI * t / 7000.0).cos())
            } else {
                0.5 * (1.0 + (2.0 * PI * (t - 7000.0) / 2400.0).cos())
            };
            SensorSample {
                timestamp_ms: t,
                accel_y: -1.0,
                filtered_mag: Some(1.0 + u),
                ..Default::default()
            }
        })
        .collect()
}

#[test]
fn clean_curls_segment_on_valleys() {
    let samples = curl_session(6);
    let profile = builtin_profile(ExerciseKind::ConcentrationCurls);
    let out = segment_session(&samples, profile);

    assert_eq!(out.status(), Status::Ok);
    let seg = out.value();
    assert_eq!(seg.strategy, SegmentationStrategy::Normal);
    assert_eq!(seg.segments.len(), 6);
    assert_eq!(seg.boundaries[0], 0);
    assert_eq!(*seg.boundaries.last().unwrap(), samples.len());
    assert_eq!(seg.trailing_excluded, 0);

    // Dalene ligger hver 100. sample (2000 ms / 20 ms)
    for (k, b) in seg.boundaries[1..seg.boundaries.len() - 1].iter().enumerate() {
        let expected = (k + 1) * 100;
        assert!(b.abs_diff(expected) <= 2, "boundary {} vs {}", b, expected);
    }
    for r in &seg.segments {
        assert!((r.duration_ms - 2000.0).abs() <= 2.0 * DT_MS, "rep {}: {}", r.rep, r.duration_ms);
    }
}

#[test]
fn segments_are_contiguous_and_ordered() {
    let samples = curl_session(8);
    let out = segment_session(&samples, builtin_profile(ExerciseKind::Unknown));
    let seg = out.value();

    assert!(seg.boundaries.windows(2).all(|w| w[0] < w[1]));
    for (i, pair) in seg.segments.windows(2).enumerate() {
        assert_eq!(pair[0].end_idx + 1, pair[1].start_idx, "gap after rep {}", i + 1);
        assert_eq!(pair[0].rep + 1, pair[1].rep);
    }
    for r in &seg.segments {
        assert!(r.start_idx <= r.peak_idx && r.peak_idx <= r.end_idx);
        assert!(r.amplitude >= 0.0);
    }
}

#[test]
fn short_valleys_are_merged_by_duration_filter() {
    // 500 ms-"reps" er under minimum (800 ms) → annenhver dal forkastes
    let samples = curl_session_with(12, 500.0);
    let profile = builtin_profile(ExerciseKind::ConcentrationCurls);
    let out = segment_session(&samples, profile);
    let seg = out.value();

    assert_ne!(seg.strategy, SegmentationStrategy::Degenerate);
    assert!(!seg.segments.is_empty());
    assert!(seg.segments.len() < 12);
    for r in &seg.segments {
        assert!(
            r.duration_ms >= profile.min_rep_duration_ms && r.duration_ms <= profile.max_rep_duration_ms,
            "rep {} lasted {} ms",
            r.rep,
            r.duration_ms
        );
    }
}

#[test]
fn signal_without_extrema_is_degenerate() {
    let samples = ramp_session(600, false);
    let out = segment_session(&samples, builtin_profile(ExerciseKind::Unknown));

    assert_eq!(out.status(), Status::SegmentationFailure);
    let seg = out.value();
    assert_eq!(seg.strategy, SegmentationStrategy::Degenerate);
    assert_eq!(seg.boundaries, vec![0, 600]);
    assert_eq!(seg.segments.len(), 1);
    assert_eq!(seg.segments[0].end_idx, 599);
}

#[test]
fn empty_session_has_no_reps() {
    let out = segment_session(&[], builtin_profile(ExerciseKind::BenchPress));
    assert_eq!(out.status(), Status::SegmentationFailure);
    assert!(out.value().boundaries.is_empty());
    assert!(out.value().segments.is_empty());
}

#[test]
fn guided_fallback_uses_rep_hints() {
    // Ingen daler, men opptaksappen har merket 6 reps à 100 samples
    let samples = ramp_session(600, true);
    let out = segment_session(&samples, builtin_profile(ExerciseKind::Unknown));

    assert_eq!(out.status(), Status::Ok);
    let seg = out.value();
    assert_eq!(seg.strategy, SegmentationStrategy::GuidedFallback);
    // Vindu ±19 samples rundt hver rep-slutt; minimum i stigende signal = vindusstart
    assert_eq!(seg.boundaries, vec![0, 80, 180, 280, 380, 480, 580]);
    assert_eq!(seg.segments.len(), 6);
    assert_eq!(seg.trailing_excluded, 20);
}

#[test]
fn missing_channel_falls_back_to_accel_magnitude() {
    let mut samples = curl_session(4);
    for s in &mut samples {
        s.filtered_mag = None;
    }
    let out = segment_session(&samples, builtin_profile(ExerciseKind::Unknown));
    assert_eq!(out.value().channel, liftgraph_core::Channel::AccelMag);
}

#[test]
fn segmentation_is_deterministic() {
    let samples = curl_session(5);
    let profile = builtin_profile(ExerciseKind::OverheadExtension);
    let a = segment_session(&samples, profile);
    let b = segment_session(&samples, profile);
    assert_eq!(a, b);
}

#[test]
fn sessions_can_be_segmented_in_parallel() {
    let sessions: Vec<_> = (3..7).map(curl_session).collect();
    let profile = builtin_profile(ExerciseKind::ConcentrationCurls);

    let sequential: Vec<_> = sessions.iter().map(|s| segment_session(s, profile)).collect();
    let parallel: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = sessions
            .iter()
            .map(|s| scope.spawn(move || segment_session(s, profile)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
    for (out, reps) in parallel.iter().zip(3..7) {
        assert_eq!(out.value().segments.len(), reps);
    }
}

#[test]
fn weak_valleys_resolve_at_lower_retry_scale() {
    // Dalprominens 1.0: 2.5 og 1.25 er for strengt, 0.625 treffer
    let samples = curl_session(3);
    let profile = curl_profile_with_floor(2.5);
    let out = segment_session(&samples, &profile);

    assert_eq!(out.status(), Status::Ok);
    let seg = out.value();
    assert_eq!(seg.strategy, SegmentationStrategy::Retry { scale: 0.25 });
    assert!((seg.min_prominence - 0.625).abs() < 1e-12);
    assert_eq!(seg.segments.len(), 3);
    assert_eq!(*seg.boundaries.last().unwrap(), samples.len());
    for r in &seg.segments {
        assert!((r.duration_ms - 2000.0).abs() <= 2.0 * DT_MS, "rep {}: {}", r.rep, r.duration_ms);
    }
}

#[test]
fn retry_keeps_every_rep_in_longer_session() {
    let samples = curl_session(5);
    let out = segment_session(&samples, &curl_profile_with_floor(2.5));

    let seg = out.value();
    assert_eq!(seg.strategy, SegmentationStrategy::Retry { scale: 0.25 });
    assert_eq!(seg.segments.len(), 5);
    assert!(seg.segments.iter().all(|r| r.duration_ms <= 2000.0 + 2.0 * DT_MS));
}

#[test]
fn peaks_become_boundaries_when_no_valley_passes() {
    let samples = slow_start_session();
    let profile = builtin_profile(ExerciseKind::ConcentrationCurls);
    let out = segment_session(&samples, profile);

    assert_eq!(out.status(), Status::Ok);
    let seg = out.value();
    assert_eq!(seg.strategy, SegmentationStrategy::PeakFallback);
    // 0 | topper i 350, 470, 590, 710 | n
    assert_eq!(seg.boundaries.len(), 6);
    assert_eq!(seg.segments.len(), 5);
    assert_eq!(seg.trailing_excluded, 0);
    assert_eq!(*seg.boundaries.last().unwrap(), samples.len());
    for (k, b) in seg.boundaries[1..5].iter().enumerate() {
        let expected = 350 + k * 120;
        assert!(b.abs_diff(expected) <= 2, "boundary {} vs {}", b, expected);
    }
    for r in &seg.segments {
        assert!(
            r.duration_ms >= profile.min_rep_duration_ms && r.duration_ms <= profile.max_rep_duration_ms,
            "rep {} lasted {} ms",
            r.rep,
            r.duration_ms
        );
    }
}
