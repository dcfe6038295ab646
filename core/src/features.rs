use std::collections::BTreeMap;

use crate::error::{Outcome, Status};
use crate::models::{AnalysisConfig, ExerciseProfile, PhaseParams, SmoothnessParams};
use crate::peaks::{find_peaks, find_valleys, range_and_std, PeakParams};
use crate::segmentation::argmax;
use crate::stats::{channel_stats, mean, rms, std_pop};
use crate::types::{
    AngleRom, Axis, Channel, ChannelStats, GyroFeatures, PeakType, PhaseSplit, RepFeatureSet,
    RepSegment, SensorSample, SmoothnessBreakdown,
};

/// Under dette antallet samples beregnes ingen derivatbaserte metrikker.
pub const MIN_DERIVATIVE_SAMPLES: usize = 3;

/// Statistikk-suffikser i den rekkefølgen klassifiseringsmodellene forventer.
pub const STAT_SUFFIXES: [&str; 18] = [
    "mean", "std", "min", "max", "range", "median", "p25", "p75", "iqr", "skew", "kurtosis",
    "energy", "rms", "diff_mean", "diff_std", "diff_max", "peak_position", "peak_value",
];

/// Kanalene modellene er trent på (gyroMag inngår ikke).
pub const MODEL_FEATURE_CHANNELS: [Channel; 11] = [
    Channel::FilteredMag,
    Channel::FilteredX,
    Channel::FilteredY,
    Channel::FilteredZ,
    Channel::AccelMag,
    Channel::AccelX,
    Channel::AccelY,
    Channel::AccelZ,
    Channel::GyroX,
    Channel::GyroY,
    Channel::GyroZ,
];

/// 3 tidsfeatures + 11 kanaler × 18 statistikker = 201 navn.
pub fn model_feature_names() -> Vec<String> {
    let mut out = vec![
        "rep_duration_ms".to_string(),
        "sample_count".to_string(),
        "avg_sample_rate".to_string(),
    ];
    for ch in MODEL_FEATURE_CHANNELS {
        for s in STAT_SUFFIXES {
            out.push(format!("{}_{}", ch.name(), s));
        }
    }
    out
}

// ──────────────────────────────────────────────────────────────────────────────
// PER-REP EKSTRAKSJON
// ──────────────────────────────────────────────────────────────────────────────

/// Beregner alle metrikker for én rep.
///
/// `session` er hele økten; rep'en er `segment.start_idx..=segment.end_idx`.
/// `channel` er kanalen segmenteringen kjørte på.
///
/// Status:
/// * `InsufficientData` – under 3 samples, derivatfelt 0 og smoothness 100
/// * `DegenerateSignal` – spenn under gulvet eller null varighet; verdiene er
///   beregnet med gulvet
pub fn extract_rep_features(
    session: &[SensorSample],
    segment: &RepSegment,
    channel: Channel,
    profile: &ExerciseProfile,
    config: &AnalysisConfig,
) -> Outcome<RepFeatureSet> {
    let end = segment.end_idx.min(session.len().saturating_sub(1));
    let rep: &[SensorSample] = if session.is_empty() || segment.start_idx > end {
        &[]
    } else {
        &session[segment.start_idx..=end]
    };
    let n = rep.len();

    let mut fs = RepFeatureSet {
        rep: segment.rep,
        sample_count: n,
        duration_ms: segment.duration_ms,
        ..Default::default()
    };
    if n == 0 {
        return Outcome::InsufficientData(fs);
    }

    let ts: Vec<f64> = rep.iter().map(|s| s.timestamp_ms).collect();
    if n > 1 {
        let mean_dt = (ts[n - 1] - ts[0]) / (n - 1) as f64;
        fs.avg_sample_rate_hz = if mean_dt > 0.0 { 1000.0 / mean_dt } else { 0.0 };
    }

    // Statistikk kun for kanaler som finnes i hvert sample
    fs.channels = Channel::ALL
        .into_iter()
        .filter_map(|ch| ch.series(rep).map(|v| (ch, channel_stats(&v))))
        .collect::<BTreeMap<_, _>>();

    let signal = match channel.series(rep) {
        Some(v) => v,
        None => channel.resolve_series(rep).1,
    };
    let (range, _) = range_and_std(&signal);
    fs.peak_value = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    fs.rom_raw = range;

    let ax: Vec<f64> = rep.iter().map(|s| s.accel_x).collect();
    let ay: Vec<f64> = rep.iter().map(|s| s.accel_y).collect();
    let az: Vec<f64> = rep.iter().map(|s| s.accel_z).collect();
    fs.rom = tilt_rom(&ax, &ay, &az);
    fs.phase = phase_split(&ts, [&ax, &ay, &az], &config.phase, profile.min_prominence_floor);

    let omega: Option<Vec<f64>> = rep.iter().map(|s| s.gyro_magnitude()).collect();
    if let Some(w) = omega {
        fs.gyro = gyro_features(&w, &ts);
    }

    if n < MIN_DERIVATIVE_SAMPLES {
        fs.smoothness = SmoothnessBreakdown {
            smoothness_score: 100.0,
            ..Default::default()
        };
        log::debug!("rep {}: {} samples, derivative metrics skipped", segment.rep, n);
        return Outcome::InsufficientData(fs);
    }

    let span_ms = ts[n - 1] - ts[0];
    let (smoothness, degenerate) = smoothness(&signal, span_ms, &config.smoothness);
    fs.smoothness = smoothness;

    let status = if degenerate { Status::DegenerateSignal } else { Status::Ok };
    Outcome::with_status(status, fs)
}

/// Fortegn der null er null (f64::signum gir ±1 for ±0).
#[inline]
fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Uregelmessighet fra normalisert jerk, retningsskift og ekstra topper.
/// Returnerer også om signalet var degenerert (spenn under gulv / null tid).
pub fn smoothness(signal: &[f64], span_ms: f64, p: &SmoothnessParams) -> (SmoothnessBreakdown, bool) {
    let n = signal.len();
    if n < MIN_DERIVATIVE_SAMPLES {
        return (
            SmoothnessBreakdown { smoothness_score: 100.0, ..Default::default() },
            false,
        );
    }

    let (raw_range, _) = range_and_std(signal);
    let mut degenerate = raw_range < p.rom_floor;
    let rom = raw_range.max(p.rom_floor);

    let duration_s = span_ms / 1000.0;
    let (normalized_jerk, direction_change_rate) = if duration_s > 0.0 {
        let dt = duration_s / (n - 1) as f64;
        let velocity: Vec<f64> = signal.windows(2).map(|w| (w[1] - w[0]) / dt).collect();
        let jerk: Vec<f64> = velocity.windows(2).map(|w| ((w[1] - w[0]) / dt).abs()).collect();
        let nj = mean(&jerk) / rom;

        let changes = velocity
            .windows(2)
            .filter(|w| sign(w[0]) != sign(w[1]))
            .count();
        (nj, changes as f64 / duration_s)
    } else {
        degenerate = true;
        (0.0, 0.0)
    };

    let params = PeakParams { distance: 1, prominence: rom * p.peak_prominence_ratio };
    let total = find_peaks(signal, params).len() + find_valleys(signal, params).len();
    let excess_peaks = total.saturating_sub(p.peak_allowance);

    let jerk_c = ((normalized_jerk - p.jerk_baseline).max(0.0) * p.jerk_scale).min(p.jerk_cap);
    let dir_c = ((direction_change_rate - p.direction_baseline).max(0.0) * p.direction_scale)
        .min(p.direction_cap);
    let peak_c = (excess_peaks as f64 * p.peak_scale).min(p.peak_cap);
    let irregularity = (jerk_c + dir_c + peak_c).clamp(0.0, 100.0);

    (
        SmoothnessBreakdown {
            normalized_jerk,
            direction_change_rate,
            excess_peaks,
            irregularity_score: irregularity,
            smoothness_score: 100.0 - irregularity,
        },
        degenerate,
    )
}

/// Tiltvinkel per sample: atan2(ay, √(ax²+az²)) i grader, +90 → 0–180°.
pub fn tilt_angles(ax: &[f64], ay: &[f64], az: &[f64]) -> Vec<f64> {
    ax.iter()
        .zip(ay)
        .zip(az)
        .map(|((x, y), z)| y.atan2((x * x + z * z).sqrt()).to_degrees() + 90.0)
        .collect()
}

pub fn tilt_rom(ax: &[f64], ay: &[f64], az: &[f64]) -> AngleRom {
    let a = tilt_angles(ax, ay, az);
    if a.is_empty() {
        return AngleRom::default();
    }
    let min_angle = a.iter().copied().fold(f64::INFINITY, f64::min);
    let max_angle = a.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    AngleRom {
        rom_degrees: max_angle - min_angle,
        min_angle,
        max_angle,
        mean_angle: mean(&a),
    }
}

/// Konsentrisk/eksentrisk deling rundt den største toppen (±) på aksen med
/// størst spenn.
pub fn phase_split(ts: &[f64], axes: [&[f64]; 3], p: &PhaseParams, prominence_floor: f64) -> PhaseSplit {
    let n = ts.len();
    if n == 0 {
        return PhaseSplit::default();
    }

    // Første akse vinner ved likt spenn
    let mut best = (Axis::X, axes[0], range_and_std(axes[0]).0);
    for (axis, xs) in [(Axis::Y, axes[1]), (Axis::Z, axes[2])] {
        let r = range_and_std(xs).0;
        if r > best.2 {
            best = (axis, xs, r);
        }
    }
    let (axis, x, axis_range) = best;

    let params = PeakParams {
        distance: p.peak_distance.max(1),
        prominence: (axis_range * p.prominence_ratio).max(prominence_floor),
    };
    let mut extrema = find_peaks(x, params);
    extrema.extend(find_valleys(x, params));

    let abs: Vec<f64> = x.iter().map(|v| v.abs()).collect();
    let transition = if extrema.is_empty() {
        argmax(&abs).unwrap_or(0)
    } else {
        let mags: Vec<f64> = extrema.iter().map(|&i| abs[i]).collect();
        extrema[argmax(&mags).unwrap_or(0)]
    };

    let concentric = ts[transition] - ts[0];
    let eccentric = ts[n - 1] - ts[transition];
    let total = concentric + eccentric;
    let pct = |part: f64| if total > 0.0 { part / total * 100.0 } else { 0.0 };

    PhaseSplit {
        primary_movement_axis: axis,
        primary_axis_range: axis_range,
        transition_idx: transition,
        peak_type: if x[transition] > 0.0 { PeakType::Positive } else { PeakType::Negative },
        concentric_duration_ms: concentric,
        eccentric_duration_ms: eccentric,
        concentric_eccentric_ratio: if eccentric > 0.0 { concentric / eccentric } else { 0.0 },
        concentric_percentage: pct(concentric),
        eccentric_percentage: pct(eccentric),
        peak_time_percentage: transition as f64 / n as f64 * 100.0,
    }
}

/// Gyro-features fra |ω|. Shakiness = RMS av vinkelakselerasjon.
pub fn gyro_features(omega: &[f64], ts: &[f64]) -> GyroFeatures {
    let n = omega.len();
    if n == 0 {
        return GyroFeatures::default();
    }
    let span_ms = ts[ts.len() - 1] - ts[0];
    let shakiness = if n >= MIN_DERIVATIVE_SAMPLES && span_ms > 0.0 {
        let dt = (span_ms / 1000.0) / (n - 1) as f64;
        let alpha: Vec<f64> = omega.windows(2).map(|w| (w[1] - w[0]) / dt).collect();
        rms(&alpha)
    } else {
        0.0
    };
    GyroFeatures {
        has_gyro: true,
        gyro_peak: omega.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        gyro_rms: rms(omega),
        gyro_std: std_pop(omega),
        shakiness,
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// FLAT FEATURE-VEKTOR
// ──────────────────────────────────────────────────────────────────────────────

impl ChannelStats {
    /// (suffiks, verdi) i samme rekkefølge som `STAT_SUFFIXES`.
    pub fn named_values(&self) -> [(&'static str, Option<f64>); 18] {
        [
            ("mean", Some(self.mean)),
            ("std", Some(self.std)),
            ("min", Some(self.min)),
            ("max", Some(self.max)),
            ("range", Some(self.range)),
            ("median", Some(self.median)),
            ("p25", Some(self.p25)),
            ("p75", Some(self.p75)),
            ("iqr", Some(self.iqr)),
            ("skew", self.skew),
            ("kurtosis", self.kurtosis),
            ("energy", Some(self.energy)),
            ("rms", Some(self.rms)),
            ("diff_mean", self.diff_mean),
            ("diff_std", self.diff_std),
            ("diff_max", self.diff_max),
            ("peak_position", Some(self.peak_position)),
            ("peak_value", Some(self.peak_value)),
        ]
    }
}

impl RepFeatureSet {
    /// Flate featurenavn slik klassifiseringstjenesten kjenner dem.
    /// Udefinerte verdier (skew under 3 samples osv.) utelates.
    pub fn feature_map(&self) -> BTreeMap<String, f64> {
        let mut m = BTreeMap::new();
        m.insert("rep_duration_ms".to_string(), self.duration_ms);
        m.insert("sample_count".to_string(), self.sample_count as f64);
        m.insert("avg_sample_rate".to_string(), self.avg_sample_rate_hz);

        for (ch, st) in &self.channels {
            for (suffix, v) in st.named_values() {
                if let Some(v) = v {
                    m.insert(format!("{}_{}", ch.name(), suffix), v);
                }
            }
        }

        let s = &self.smoothness;
        let ph = &self.phase;
        let g = &self.gyro;
        let extra = [
            ("peak", self.peak_value),
            ("rom", self.rom_raw),
            ("rom_degrees", self.rom.rom_degrees),
            ("min_angle", self.rom.min_angle),
            ("max_angle", self.rom.max_angle),
            ("mean_angle", self.rom.mean_angle),
            ("normalized_jerk", s.normalized_jerk),
            ("direction_change_rate", s.direction_change_rate),
            ("excess_peaks", s.excess_peaks as f64),
            ("irregularity_score", s.irregularity_score),
            ("smoothness_score", s.smoothness_score),
            ("concentric_duration_ms", ph.concentric_duration_ms),
            ("eccentric_duration_ms", ph.eccentric_duration_ms),
            ("concentric_eccentric_ratio", ph.concentric_eccentric_ratio),
            ("concentric_percentage", ph.concentric_percentage),
            ("eccentric_percentage", ph.eccentric_percentage),
            ("peak_time_percentage", ph.peak_time_percentage),
            ("primary_axis_range", ph.primary_axis_range),
            ("gyro_peak", g.gyro_peak),
            ("gyro_rms", g.gyro_rms),
            ("gyro_std", g.gyro_std),
            ("shakiness", g.shakiness),
        ];
        for (k, v) in extra {
            m.insert(k.to_string(), v);
        }
        m
    }

    /// Verdier i oppgitt rekkefølge; manglende eller ikke-endelige → 0.
    pub fn feature_vector<S: AsRef<str>>(&self, names: &[S]) -> Vec<f64> {
        let m = self.feature_map();
        names
            .iter()
            .map(|k| match m.get(k.as_ref()) {
                Some(v) if v.is_finite() => *v,
                _ => 0.0,
            })
            .collect()
    }
}
