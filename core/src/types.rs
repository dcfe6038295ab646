use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ExerciseKind;

// ──────────────────────────────────────────────────────────────────────────────
// INNGANG
// ──────────────────────────────────────────────────────────────────────────────

/// Én tidsstemplet IMU-lesning. Feltnavnene aksepterer også kolonnenavnene fra
/// opptaksappen (`accelX`, `filteredMag`, `gyroZ`, `rep` …).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    #[serde(alias = "timestampMs", alias = "cumulative_timestamp_ms")]
    pub timestamp_ms: f64,

    #[serde(alias = "accelX")]
    pub accel_x: f64,
    #[serde(alias = "accelY")]
    pub accel_y: f64,
    #[serde(alias = "accelZ")]
    pub accel_z: f64,
    #[serde(default, alias = "accelMag")]
    pub accel_mag: Option<f64>,

    #[serde(default, alias = "filteredX")]
    pub filtered_x: Option<f64>,
    #[serde(default, alias = "filteredY")]
    pub filtered_y: Option<f64>,
    #[serde(default, alias = "filteredZ")]
    pub filtered_z: Option<f64>,
    #[serde(default, alias = "filteredMag")]
    pub filtered_mag: Option<f64>,

    #[serde(default, alias = "gyroX")]
    pub gyro_x: Option<f64>,
    #[serde(default, alias = "gyroY")]
    pub gyro_y: Option<f64>,
    #[serde(default, alias = "gyroZ")]
    pub gyro_z: Option<f64>,
    #[serde(default, alias = "gyroMag")]
    pub gyro_mag: Option<f64>,

    /// Omtrentlig rep-nummer satt av opptaksappen (0 = ikke merket).
    /// Brukes kun av den guidede fallbacken i segmenteringen.
    #[serde(default, alias = "rep")]
    pub rep_hint: Option<u32>,
}

#[inline]
fn norm3(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}

impl SensorSample {
    /// Vinkelhastighet |ω| hvis gyro er tilgjengelig.
    pub fn gyro_magnitude(&self) -> Option<f64> {
        match (self.gyro_mag, self.gyro_x, self.gyro_y, self.gyro_z) {
            (Some(m), _, _, _) => Some(m),
            (None, Some(x), Some(y), Some(z)) => Some(norm3(x, y, z)),
            _ => None,
        }
    }

    pub fn accel_magnitude(&self) -> f64 {
        self.accel_mag
            .unwrap_or_else(|| norm3(self.accel_x, self.accel_y, self.accel_z))
    }
}

/// Signal-kanaler som features beregnes for. Serde-navnet er kolonnenavnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "filteredMag")]
    FilteredMag,
    #[serde(rename = "filteredX")]
    FilteredX,
    #[serde(rename = "filteredY")]
    FilteredY,
    #[serde(rename = "filteredZ")]
    FilteredZ,
    #[serde(rename = "accelMag")]
    AccelMag,
    #[serde(rename = "accelX")]
    AccelX,
    #[serde(rename = "accelY")]
    AccelY,
    #[serde(rename = "accelZ")]
    AccelZ,
    #[serde(rename = "gyroMag")]
    GyroMag,
    #[serde(rename = "gyroX")]
    GyroX,
    #[serde(rename = "gyroY")]
    GyroY,
    #[serde(rename = "gyroZ")]
    GyroZ,
}

impl Channel {
    pub const ALL: [Channel; 12] = [
        Channel::FilteredMag,
        Channel::FilteredX,
        Channel::FilteredY,
        Channel::FilteredZ,
        Channel::AccelMag,
        Channel::AccelX,
        Channel::AccelY,
        Channel::AccelZ,
        Channel::GyroMag,
        Channel::GyroX,
        Channel::GyroY,
        Channel::GyroZ,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::FilteredMag => "filteredMag",
            Channel::FilteredX => "filteredX",
            Channel::FilteredY => "filteredY",
            Channel::FilteredZ => "filteredZ",
            Channel::AccelMag => "accelMag",
            Channel::AccelX => "accelX",
            Channel::AccelY => "accelY",
            Channel::AccelZ => "accelZ",
            Channel::GyroMag => "gyroMag",
            Channel::GyroX => "gyroX",
            Channel::GyroY => "gyroY",
            Channel::GyroZ => "gyroZ",
        }
    }

    /// Filtrerte kanaler faller tilbake til rå akselerometer.
    pub fn fallback(&self) -> Option<Channel> {
        match self {
            Channel::FilteredMag => Some(Channel::AccelMag),
            Channel::FilteredX => Some(Channel::AccelX),
            Channel::FilteredY => Some(Channel::AccelY),
            Channel::FilteredZ => Some(Channel::AccelZ),
            _ => None,
        }
    }

    pub fn value(&self, s: &SensorSample) -> Option<f64> {
        match self {
            Channel::FilteredMag => s.filtered_mag.or_else(|| {
                match (s.filtered_x, s.filtered_y, s.filtered_z) {
                    (Some(x), Some(y), Some(z)) => Some(norm3(x, y, z)),
                    _ => None,
                }
            }),
            Channel::FilteredX => s.filtered_x,
            Channel::FilteredY => s.filtered_y,
            Channel::FilteredZ => s.filtered_z,
            Channel::AccelMag => Some(s.accel_magnitude()),
            Channel::AccelX => Some(s.accel_x),
            Channel::AccelY => Some(s.accel_y),
            Channel::AccelZ => Some(s.accel_z),
            Channel::GyroMag => s.gyro_magnitude(),
            Channel::GyroX => s.gyro_x,
            Channel::GyroY => s.gyro_y,
            Channel::GyroZ => s.gyro_z,
        }
    }

    /// Hele serien, eller `None` hvis minst ett sample mangler kanalen.
    pub fn series(&self, samples: &[SensorSample]) -> Option<Vec<f64>> {
        samples.iter().map(|s| self.value(s)).collect()
    }

    /// Serien for kanalen eller nærmeste tilgjengelige fallback.
    /// Returnerer kanalen som faktisk ble brukt.
    pub fn resolve_series(&self, samples: &[SensorSample]) -> (Channel, Vec<f64>) {
        let mut ch = *self;
        loop {
            if let Some(v) = ch.series(samples) {
                return (ch, v);
            }
            match ch.fallback() {
                Some(next) => ch = next,
                None => break,
            }
        }
        // Rå magnitude finnes alltid
        (Channel::AccelMag, Channel::AccelMag.series(samples).unwrap_or_default())
    }
}

/// Akselerometer-akse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

// ──────────────────────────────────────────────────────────────────────────────
// SEGMENTERING
// ──────────────────────────────────────────────────────────────────────────────

/// Ett detektert repetisjonsvindu.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepSegment {
    /// 1-basert rep-nummer
    pub rep: u32,
    pub start_idx: usize,
    /// Siste sample i rep'en (inklusiv)
    pub end_idx: usize,
    pub start_time_ms: f64,
    /// Tid for lukkende grense (dalen som deles med neste rep)
    pub end_time_ms: f64,
    pub duration_ms: f64,
    pub peak_idx: usize,
    pub peak_time_ms: f64,
    pub peak_value: f64,
    pub valley_value: f64,
    pub amplitude: f64,
}

impl RepSegment {
    pub fn sample_count(&self) -> usize {
        self.end_idx + 1 - self.start_idx
    }
}

/// Hvilket trinn i fallback-stigen som ga grensene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentationStrategy {
    Normal,
    Retry { scale: f64 },
    PeakFallback,
    GuidedFallback,
    Degenerate,
}

impl SegmentationStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            SegmentationStrategy::Normal => "normal",
            SegmentationStrategy::Retry { .. } => "retry",
            SegmentationStrategy::PeakFallback => "peak_fallback",
            SegmentationStrategy::GuidedFallback => "guided_fallback",
            SegmentationStrategy::Degenerate => "degenerate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub strategy: SegmentationStrategy,
    /// Kanalen segmenteringen faktisk kjørte på
    pub channel: Channel,
    /// Aksepterte grenser; `n` (antall samples) betyr øktens slutt
    pub boundaries: Vec<usize>,
    pub segments: Vec<RepSegment>,
    pub min_prominence: f64,
    pub min_distance: usize,
    /// Samples før første grense (alltid 0 utenom guidet fallback)
    pub leading_excluded: usize,
    /// Samples etter siste grense som ikke ble en gyldig rep
    pub trailing_excluded: usize,
}

// ──────────────────────────────────────────────────────────────────────────────
// PER-REP FEATURES
// ──────────────────────────────────────────────────────────────────────────────

/// Deskriptiv statistikk for én kanal i én rep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    pub iqr: f64,
    /// Udefinert under 3 samples
    pub skew: Option<f64>,
    /// Udefinert under 4 samples
    pub kurtosis: Option<f64>,
    pub energy: f64,
    pub rms: f64,
    pub diff_mean: Option<f64>,
    pub diff_std: Option<f64>,
    pub diff_max: Option<f64>,
    /// argmax / n
    pub peak_position: f64,
    pub peak_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothnessBreakdown {
    pub normalized_jerk: f64,
    /// Fortegnsskift i første differanse per sekund
    pub direction_change_rate: f64,
    pub excess_peaks: usize,
    pub irregularity_score: f64,
    pub smoothness_score: f64,
}

/// Vinkelbasert bevegelsesutslag (0–180°).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngleRom {
    pub rom_degrees: f64,
    pub min_angle: f64,
    pub max_angle: f64,
    pub mean_angle: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakType {
    #[default]
    Positive,
    Negative,
}

/// Konsentrisk/eksentrisk fasedeling rundt hovedtoppen på primæraksen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseSplit {
    pub primary_movement_axis: Axis,
    pub primary_axis_range: f64,
    /// Indeks relativt til rep-start
    pub transition_idx: usize,
    pub peak_type: PeakType,
    pub concentric_duration_ms: f64,
    pub eccentric_duration_ms: f64,
    pub concentric_eccentric_ratio: f64,
    pub concentric_percentage: f64,
    pub eccentric_percentage: f64,
    pub peak_time_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GyroFeatures {
    pub has_gyro: bool,
    pub gyro_peak: f64,
    pub gyro_rms: f64,
    pub gyro_std: f64,
    /// RMS av vinkelakselerasjon innen rep'en
    pub shakiness: f64,
}

/// Alle beregnede metrikker for én rep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepFeatureSet {
    pub rep: u32,
    pub sample_count: usize,
    pub duration_ms: f64,
    pub avg_sample_rate_hz: f64,
    pub channels: BTreeMap<Channel, ChannelStats>,
    /// Maks av segmenteringskanalen i rep'en
    pub peak_value: f64,
    pub rom_raw: f64,
    pub rom: AngleRom,
    pub smoothness: SmoothnessBreakdown,
    pub phase: PhaseSplit,
    pub gyro: GyroFeatures,
}

impl RepFeatureSet {
    pub fn smoothness_score(&self) -> f64 {
        self.smoothness.smoothness_score
    }

    pub fn irregularity_score(&self) -> f64 {
        self.smoothness.irregularity_score
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// ØKT / TRETTHET
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatigueLevel {
    #[default]
    InsufficientData,
    Minimal,
    Low,
    Moderate,
    High,
    Severe,
}

impl FatigueLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 10.0 {
            FatigueLevel::Minimal
        } else if score < 20.0 {
            FatigueLevel::Low
        } else if score < 35.0 {
            FatigueLevel::Moderate
        } else if score < 55.0 {
            FatigueLevel::High
        } else {
            FatigueLevel::Severe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueLevel::InsufficientData => "insufficient_data",
            FatigueLevel::Minimal => "minimal",
            FatigueLevel::Low => "low",
            FatigueLevel::Moderate => "moderate",
            FatigueLevel::High => "high",
            FatigueLevel::Severe => "severe",
        }
    }

    pub fn session_quality(&self) -> &'static str {
        match self {
            FatigueLevel::InsufficientData => "Insufficient Data",
            FatigueLevel::Minimal => "Excellent",
            FatigueLevel::Low => "Good",
            FatigueLevel::Moderate => "Fair",
            FatigueLevel::High => "Poor",
            FatigueLevel::Severe => "Very Poor",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GyroDirection {
    #[default]
    Stable,
    Drop,
    Surge,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyBreakdown {
    pub rom: f64,
    pub smoothness: f64,
    pub duration: f64,
    pub peak: f64,
    pub gyro: f64,
}

/// Lineære trender i prosent av snittet per rep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendBreakdown {
    pub rom: f64,
    pub smoothness: f64,
    pub duration: f64,
    pub peak: f64,
    pub gyro: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EarlyVsLate {
    pub rom_change_percent: f64,
    pub smoothness_degradation_percent: f64,
    pub duration_increase_percent: f64,
    pub peak_degradation_percent: f64,
    pub gyro_peak_change_percent: f64,
    pub jerk_increase_percent: f64,
    pub shakiness_increase_percent: f64,
    pub avg_gyro_peak_first: f64,
    pub avg_gyro_peak_last: f64,
    pub avg_shakiness_first: f64,
    pub avg_shakiness_last: f64,
    pub avg_rom_first: f64,
    pub avg_rom_last: f64,
    pub avg_smoothness_first: f64,
    pub avg_smoothness_last: f64,
    pub avg_duration_first_ms: f64,
    pub avg_duration_last_ms: f64,
}

/// Øktoppsummering: tretthet, konsistens og trender.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFatigueReport {
    pub fatigue_score: f64,
    pub fatigue_level: FatigueLevel,
    #[serde(rename = "D_omega")]
    pub d_omega: f64,
    #[serde(rename = "I_T")]
    pub i_t: f64,
    #[serde(rename = "I_J")]
    pub i_j: f64,
    #[serde(rename = "I_S")]
    pub i_s: f64,
    pub gyro_direction: GyroDirection,
    pub has_gyro: bool,
    pub consistency_score: f64,
    pub consistency: ConsistencyBreakdown,
    pub trends: TrendBreakdown,
    pub early_vs_late: EarlyVsLate,
    pub session_quality: String,
    pub consistency_rating: String,
    pub key_findings: Vec<String>,
    pub n_reps_analyzed: usize,
}

/// Beskrivelse av økten som følger med resultatet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub exercise: Option<ExerciseKind>,
    /// Starttid (UTC) hvis kjent
    #[serde(default)]
    pub start_time_utc: Option<DateTime<Utc>>,
}
