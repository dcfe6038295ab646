use serde::{Deserialize, Serialize};

use crate::error::{Outcome, Status};
use crate::fatigue::compute_fatigue;
use crate::features::extract_rep_features;
use crate::metrics::Metrics;
use crate::models::{AnalysisConfig, ExerciseProfile};
use crate::segmentation::segment_session;
use crate::stats::mean;
use crate::types::{RepFeatureSet, RepSegment, Segmentation, SensorSample, SessionFatigueReport, SessionMeta};

#[derive(Clone, Copy)]
pub struct AnalyzeInputs<'a> {
    /// Hele økten i tidsrekkefølge
    pub samples: &'a [SensorSample],
    /// Oppløst profil for øvelsen (se `ProfileCatalog::get`)
    pub profile: &'a ExerciseProfile,
    pub config: &'a AnalysisConfig,
    pub meta: Option<&'a SessionMeta>,
    /// Tellere (prod: delt `Metrics`, test: None)
    pub metrics: Option<&'a Metrics>,
}

/// Én rep: vinduet og metrikkene for det.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepAnalysis {
    pub segment: RepSegment,
    pub features: Outcome<RepFeatureSet>,
}

/// Øktsammendrag over reps som kom med i tretthetsanalysen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_reps: usize,
    pub avg_rom: f64,
    /// 0 når ingen rep har vinkel-ROM
    pub avg_rom_degrees: f64,
    pub has_rom_degrees: bool,
    pub avg_smoothness: f64,
    pub avg_duration_ms: f64,
    pub total_duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalysis {
    pub meta: SessionMeta,
    pub segmentation: Outcome<Segmentation>,
    pub reps: Vec<RepAnalysis>,
    pub fatigue: Outcome<SessionFatigueReport>,
    pub summary: SessionSummary,
}

impl SessionAnalysis {
    /// Metrikkene for reps med nok samples, i rep-rekkefølge.
    pub fn analysed_features(&self) -> Vec<&RepFeatureSet> {
        self.reps
            .iter()
            .filter(|r| r.features.status() != Status::InsufficientData)
            .map(|r| r.features.value())
            .collect()
    }
}

pub fn summarize(reps: &[RepFeatureSet]) -> SessionSummary {
    if reps.is_empty() {
        return SessionSummary::default();
    }
    let rom_deg: Vec<f64> = reps.iter().map(|r| r.rom.rom_degrees).collect();
    let has_rom_degrees = rom_deg.iter().any(|v| *v > 0.0);
    let durations: Vec<f64> = reps.iter().map(|r| r.duration_ms).collect();
    SessionSummary {
        total_reps: reps.len(),
        avg_rom: mean(&reps.iter().map(|r| r.rom_raw).collect::<Vec<_>>()),
        avg_rom_degrees: if has_rom_degrees { mean(&rom_deg) } else { 0.0 },
        has_rom_degrees,
        avg_smoothness: mean(&reps.iter().map(|r| r.smoothness_score()).collect::<Vec<_>>()),
        avg_duration_ms: mean(&durations),
        total_duration_ms: durations.iter().sum(),
    }
}

/// Segmentering → per-rep features → tretthetsrapport.
///
/// Feiler aldri: hvert steg returnerer en komplett verdi med status.
/// Reps under 3 samples tas ikke med i tretthet og sammendrag.
pub fn analyze_session(inputs: AnalyzeInputs) -> SessionAnalysis {
    let segmentation = segment_session(inputs.samples, inputs.profile);
    let seg = segmentation.value();

    let reps: Vec<RepAnalysis> = seg
        .segments
        .iter()
        .map(|segment| RepAnalysis {
            segment: segment.clone(),
            features: extract_rep_features(
                inputs.samples,
                segment,
                seg.channel,
                inputs.profile,
                inputs.config,
            ),
        })
        .collect();

    let analysed: Vec<RepFeatureSet> = reps
        .iter()
        .filter(|r| r.features.status() != Status::InsufficientData)
        .map(|r| r.features.value().clone())
        .collect();
    let skipped = reps.len() - analysed.len();
    if skipped > 0 {
        log::warn!("analyze: {} rep(s) with < 3 samples left out of fatigue", skipped);
    }

    let fatigue = compute_fatigue(&analysed, &inputs.config.fatigue);
    let summary = summarize(&analysed);

    if let Some(m) = inputs.metrics {
        m.record_session(
            seg.strategy.label(),
            seg.segments.len(),
            fatigue.status() == Status::InsufficientData,
        );
    }

    log::info!(
        "analyze: exercise={} reps={} fatigue={} ({:.1})",
        inputs.profile.exercise,
        reps.len(),
        fatigue.value().fatigue_level.as_str(),
        fatigue.value().fatigue_score
    );

    SessionAnalysis {
        meta: inputs.meta.cloned().unwrap_or_default(),
        segmentation,
        reps,
        fatigue,
        summary,
    }
}
