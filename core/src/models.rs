use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::types::Channel;

// ──────────────────────────────────────────────────────────────────────────────
// ØVELSER
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExerciseKind {
    ConcentrationCurls,
    OverheadExtension,
    BenchPress,
    BackSquat,
    LateralPulldown,
    SeatedLegExtension,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    Dumbbell,
    Barbell,
    WeightStack,
    Unknown,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 7] = [
        ExerciseKind::ConcentrationCurls,
        ExerciseKind::OverheadExtension,
        ExerciseKind::BenchPress,
        ExerciseKind::BackSquat,
        ExerciseKind::LateralPulldown,
        ExerciseKind::SeatedLegExtension,
        ExerciseKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::ConcentrationCurls => "CONCENTRATION_CURLS",
            ExerciseKind::OverheadExtension => "OVERHEAD_EXTENSION",
            ExerciseKind::BenchPress => "BENCH_PRESS",
            ExerciseKind::BackSquat => "BACK_SQUAT",
            ExerciseKind::LateralPulldown => "LATERAL_PULLDOWN",
            ExerciseKind::SeatedLegExtension => "SEATED_LEG_EXTENSION",
            ExerciseKind::Unknown => "UNKNOWN",
        }
    }

    pub fn equipment(&self) -> Equipment {
        match self {
            ExerciseKind::ConcentrationCurls | ExerciseKind::OverheadExtension => Equipment::Dumbbell,
            ExerciseKind::BenchPress | ExerciseKind::BackSquat => Equipment::Barbell,
            ExerciseKind::LateralPulldown | ExerciseKind::SeatedLegExtension => Equipment::WeightStack,
            ExerciseKind::Unknown => Equipment::Unknown,
        }
    }

    /// Tolker et eksplisitt øvelsesnavn ("bench press", "BENCH_PRESS", …).
    pub fn parse(name: &str) -> Result<ExerciseKind, AnalysisError> {
        let norm = name.trim().to_uppercase().replace(' ', "_").replace('-', "_");
        ExerciseKind::ALL
            .into_iter()
            .find(|k| k.as_str() == norm)
            .or_else(|| match ExerciseKind::from_source_name(name) {
                ExerciseKind::Unknown => None,
                k => Some(k),
            })
            .ok_or_else(|| AnalysisError::UnknownExercise(name.to_string()))
    }

    /// Gjenkjenner øvelsen fra et filnavn/kildenavn. Ukjent → `Unknown`.
    pub fn from_source_name(source: &str) -> ExerciseKind {
        let up = source.to_uppercase();
        let has = |a: &str| up.contains(a) || up.contains(&a.replace('_', " "));

        if has("CONCENTRATION_CURLS") {
            ExerciseKind::ConcentrationCurls
        } else if has("OVERHEAD_EXTENSION") {
            ExerciseKind::OverheadExtension
        } else if has("BENCH_PRESS") {
            ExerciseKind::BenchPress
        } else if has("BACK_SQUAT") {
            ExerciseKind::BackSquat
        } else if has("LATERAL_PULLDOWN") || has("LAT_PULLDOWN") {
            ExerciseKind::LateralPulldown
        } else if has("SEATED_LEG_EXTENSION") || has("LEG_EXTENSION") {
            ExerciseKind::SeatedLegExtension
        } else {
            ExerciseKind::Unknown
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Equipment {
    /// Kvalitetsklassene klassifiseringsmodellen bruker for utstyrstypen.
    pub fn quality_labels(&self) -> [&'static str; 3] {
        match self {
            Equipment::Dumbbell => ["Clean", "Uncontrolled Movement", "Abrupt Initiation"],
            Equipment::Barbell => ["Clean", "Uncontrolled Movement", "Inclination Asymmetry"],
            Equipment::WeightStack => ["Clean", "Pulling Too Fast", "Releasing Too Fast"],
            Equipment::Unknown => ["Clean", "Quality Issue 1", "Quality Issue 2"],
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// PROFIL
// ──────────────────────────────────────────────────────────────────────────────

/// Segmenteringsparametre for én øvelse. Løses opp én gang per økt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    pub exercise: ExerciseKind,
    #[serde(default = "default_channel")]
    pub signal_channel: Channel,
    /// Andel av signalets spenn (max−min)
    pub prominence_factor: f64,
    /// Andel av signalets standardavvik
    pub std_factor: f64,
    pub min_prominence_floor: f64,
    pub min_rep_duration_ms: f64,
    pub max_rep_duration_ms: f64,
    /// Savitzky–Golay-vindu (oddetall)
    #[serde(default = "default_window")]
    pub smoothing_window: usize,
    /// Minste tid mellom daler; omregnes til samples via median dt
    #[serde(default = "default_spacing")]
    pub min_valley_spacing_ms: f64,
}

fn default_channel() -> Channel {
    Channel::FilteredMag
}

fn default_window() -> usize {
    11
}

fn default_spacing() -> f64 {
    500.0
}

impl Default for ExerciseProfile {
    fn default() -> Self {
        Self {
            exercise: ExerciseKind::Unknown,
            signal_channel: Channel::FilteredMag,
            prominence_factor: 0.1,
            std_factor: 0.5,
            min_prominence_floor: 0.1,
            min_rep_duration_ms: 800.0,
            max_rep_duration_ms: 8000.0,
            smoothing_window: 11,
            min_valley_spacing_ms: 500.0,
        }
    }
}

impl ExerciseProfile {
    pub fn for_exercise(kind: ExerciseKind) -> ExerciseProfile {
        let base = ExerciseProfile { exercise: kind, ..Default::default() };
        match kind {
            ExerciseKind::ConcentrationCurls | ExerciseKind::OverheadExtension | ExerciseKind::Unknown => base,
            ExerciseKind::BenchPress => ExerciseProfile {
                min_rep_duration_ms: 1000.0,
                max_rep_duration_ms: 10000.0,
                ..base
            },
            ExerciseKind::BackSquat => ExerciseProfile {
                min_rep_duration_ms: 1200.0,
                max_rep_duration_ms: 12000.0,
                ..base
            },
            // Kabelmaskin: roligere signal, tregere reps, mer støy → bredere vindu
            ExerciseKind::LateralPulldown | ExerciseKind::SeatedLegExtension => ExerciseProfile {
                prominence_factor: 0.05,
                std_factor: 0.3,
                min_prominence_floor: 0.05,
                min_rep_duration_ms: 1500.0,
                max_rep_duration_ms: 12000.0,
                smoothing_window: 21,
                min_valley_spacing_ms: 1500.0,
                ..base
            },
        }
    }

    /// Vinduet tvunget til oddetall ≥ 5 (polynomgrad 3 trenger minst 4 punkter).
    pub fn effective_window(&self) -> usize {
        let w = self.smoothing_window.max(5);
        if w % 2 == 0 { w + 1 } else { w }
    }

    /// Minste avstand mellom daler i samples, utledet fra median samplingsintervall.
    pub fn min_distance_samples(&self, median_dt_ms: Option<f64>) -> usize {
        match median_dt_ms {
            Some(dt) if dt > 0.0 && dt.is_finite() => {
                ((self.min_valley_spacing_ms / dt).floor() as usize).max(1)
            }
            _ => 5,
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let fail = |reason: &str| {
            Err(AnalysisError::InvalidProfile {
                exercise: self.exercise.to_string(),
                reason: reason.to_string(),
            })
        };
        let finite = [
            self.prominence_factor,
            self.std_factor,
            self.min_prominence_floor,
            self.min_rep_duration_ms,
            self.max_rep_duration_ms,
            self.min_valley_spacing_ms,
        ];
        if finite.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return fail("parameters must be finite and non-negative");
        }
        if self.min_rep_duration_ms > self.max_rep_duration_ms {
            return fail("min_rep_duration_ms exceeds max_rep_duration_ms");
        }
        if self.smoothing_window < 5 {
            return fail("smoothing_window must be at least 5");
        }
        Ok(())
    }
}

/// Innebygd katalog: seks øvelser + ukjent.
static BUILTIN_CATALOG: Lazy<BTreeMap<ExerciseKind, ExerciseProfile>> = Lazy::new(|| {
    ExerciseKind::ALL
        .into_iter()
        .map(|k| (k, ExerciseProfile::for_exercise(k)))
        .collect()
});

/// Oppslag av profiler per øvelse. Overstyringer legges oppå den innebygde katalogen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCatalog {
    pub profiles: BTreeMap<ExerciseKind, ExerciseProfile>,
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self { profiles: BUILTIN_CATALOG.clone() }
    }
}

impl ProfileCatalog {
    pub fn get(&self, kind: ExerciseKind) -> ExerciseProfile {
        self.profiles
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ExerciseProfile::for_exercise(kind))
    }

    pub fn insert(&mut self, mut profile: ExerciseProfile, kind: ExerciseKind) {
        profile.exercise = kind;
        self.profiles.insert(kind, profile);
    }
}

pub fn builtin_profile(kind: ExerciseKind) -> &'static ExerciseProfile {
    // Alle varianter ligger i katalogen
    &BUILTIN_CATALOG[&kind]
}

// ──────────────────────────────────────────────────────────────────────────────
// ANALYSEKONFIG (empirisk tunede konstanter)
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothnessParams {
    /// Gulv for spennet ved normalisering av jerk
    pub rom_floor: f64,
    pub jerk_baseline: f64,
    pub jerk_scale: f64,
    pub jerk_cap: f64,
    pub direction_baseline: f64,
    pub direction_scale: f64,
    pub direction_cap: f64,
    /// Antall topper+daler en ren rep har
    pub peak_allowance: usize,
    pub peak_scale: f64,
    pub peak_cap: f64,
    /// Prominens for toppdeteksjon som andel av spennet
    pub peak_prominence_ratio: f64,
}

impl Default for SmoothnessParams {
    fn default() -> Self {
        Self {
            rom_floor: 0.1,
            jerk_baseline: 1.5,
            jerk_scale: 13.3,
            jerk_cap: 40.0,
            direction_baseline: 0.5,
            direction_scale: 10.0,
            direction_cap: 35.0,
            peak_allowance: 2,
            peak_scale: 3.3,
            peak_cap: 25.0,
            peak_prominence_ratio: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseParams {
    pub peak_distance: usize,
    pub prominence_ratio: f64,
}

impl Default for PhaseParams {
    fn default() -> Self {
        Self { peak_distance: 10, prominence_ratio: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatigueWeights {
    pub omega: f64,  // typ 0.35
    pub tempo: f64,  // typ 0.25
    pub jerk: f64,   // typ 0.20
    pub shaky: f64,  // typ 0.20
}

impl Default for FatigueWeights {
    fn default() -> Self {
        Self { omega: 0.35, tempo: 0.25, jerk: 0.20, shaky: 0.20 }
    }
}

impl FatigueWeights {
    /// Re-vekt til sum 1; null-sum gir standardvektene.
    pub fn normalized(&self) -> FatigueWeights {
        let parts = [self.omega, self.tempo, self.jerk, self.shaky];
        let sum: f64 = parts.iter().sum();
        if !sum.is_finite() || sum <= 0.0 || parts.iter().any(|w| *w < 0.0) {
            return FatigueWeights::default();
        }
        FatigueWeights {
            omega: self.omega / sum,
            tempo: self.tempo / sum,
            jerk: self.jerk / sum,
            shaky: self.shaky / sum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatigueParams {
    pub weights: FatigueWeights,
    pub boost_threshold: f64,
    pub boost_multiplier: f64,
    /// CV → konsistens: 100 − cv·skala
    pub cv_scale: f64,
}

impl Default for FatigueParams {
    fn default() -> Self {
        Self {
            weights: FatigueWeights::default(),
            boost_threshold: 0.40,
            boost_multiplier: 0.5,
            cv_scale: 333.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub smoothness: SmoothnessParams,
    pub phase: PhaseParams,
    pub fatigue: FatigueParams,
}
