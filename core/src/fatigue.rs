use crate::error::Outcome;
use crate::models::FatigueParams;
use crate::stats::{mean, ols_slope, std_pop};
use crate::types::{
    ConsistencyBreakdown, EarlyVsLate, FatigueLevel, GyroDirection, RepFeatureSet,
    SessionFatigueReport, TrendBreakdown,
};

/// Minste antall reps for en meningsfull tretthetsanalyse.
pub const MIN_FATIGUE_REPS: usize = 3;

const EPS: f64 = 1e-9;

/// Relativ endring siste mot første tredjedel. 0 når første snitt ≤ ε.
fn rel_change(first: f64, last: f64) -> f64 {
    if first > EPS {
        (last - first) / first
    } else {
        0.0
    }
}

/// Relativt fall (første − siste) / første. 0 når første snitt ≤ ε.
fn rel_drop(first: f64, last: f64) -> f64 {
    if first > EPS {
        (first - last) / first
    } else {
        0.0
    }
}

/// Snitt av første og siste tredjedel.
fn thirds(xs: &[f64], third: usize) -> (f64, f64) {
    let n = xs.len();
    let t = third.min(n);
    (mean(&xs[..t]), mean(&xs[n - t..]))
}

fn is_flat(xs: &[f64]) -> bool {
    std_pop(xs) <= EPS * mean(xs).abs().max(1.0)
}

/// CV → konsistens 0–100. Null varians gir 100.
pub fn consistency(xs: &[f64], cv_scale: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    if is_flat(xs) {
        return 100.0;
    }
    let cv = std_pop(xs) / mean(xs).abs().max(EPS);
    (100.0 - cv * cv_scale).clamp(0.0, 100.0)
}

/// OLS-stigning i prosent av snittet per rep.
pub fn trend_percent(xs: &[f64]) -> f64 {
    if xs.len() < 2 || is_flat(xs) {
        return 0.0;
    }
    let m = mean(xs);
    if m.abs() <= EPS {
        return 0.0;
    }
    ols_slope(xs) / m * 100.0
}

fn consistency_rating(score: f64) -> &'static str {
    if score >= 70.0 {
        "Good"
    } else if score >= 50.0 {
        "Fair"
    } else {
        "Poor"
    }
}

/// Rapport når det er for få reps. Alle tall 0, eksplisitt flagget.
pub fn insufficient_report(n_reps: usize) -> SessionFatigueReport {
    SessionFatigueReport {
        fatigue_level: FatigueLevel::InsufficientData,
        gyro_direction: GyroDirection::Stable,
        session_quality: FatigueLevel::InsufficientData.session_quality().to_string(),
        consistency_rating: "Unknown".to_string(),
        key_findings: vec!["Need at least 3 reps for analysis".to_string()],
        n_reps_analyzed: n_reps,
        ..Default::default()
    }
}

/// Tretthet, konsistens og trender for en ordnet liste av reps.
///
/// F = w_ω·D_ω + w_T·I_T + w_J·I_J + w_S·I_S over indikatorer klemt til ≥ 0,
/// med et tillegg når én indikator alene er over terskelen.
/// Under 3 reps returneres `InsufficientData` med nullrapport.
pub fn compute_fatigue(reps: &[RepFeatureSet], params: &FatigueParams) -> Outcome<SessionFatigueReport> {
    let n = reps.len();
    if n < MIN_FATIGUE_REPS {
        log::debug!("fatigue: {} reps, need {}", n, MIN_FATIGUE_REPS);
        return Outcome::InsufficientData(insufficient_report(n));
    }
    let third = (n / 3).max(1);

    let gyro_peaks: Vec<f64> = reps.iter().map(|r| r.gyro.gyro_peak).collect();
    let has_gyro = gyro_peaks.iter().any(|g| *g > 0.0);
    let shakiness: Vec<f64> = reps.iter().map(|r| r.gyro.shakiness).collect();
    let has_shakiness = shakiness.iter().any(|s| *s > 0.0);
    let durations: Vec<f64> = reps.iter().map(|r| r.duration_ms).collect();
    let jerk: Vec<f64> = reps.iter().map(|r| r.irregularity_score()).collect();
    let smooth: Vec<f64> = reps.iter().map(|r| r.smoothness_score()).collect();
    let peaks: Vec<f64> = reps.iter().map(|r| r.peak_value).collect();
    // ROM i grader når det finnes, ellers rått spenn
    let roms: Vec<f64> = if reps.iter().any(|r| r.rom.rom_degrees > 0.0) {
        reps.iter().map(|r| r.rom.rom_degrees).collect()
    } else {
        reps.iter().map(|r| r.rom_raw).collect()
    };

    // ── indikatorer ──
    let omega_series = if has_gyro { &gyro_peaks } else { &peaks };
    let (w_first, w_last) = thirds(omega_series, third);
    let d_omega = if w_first > EPS { (w_last - w_first).abs() / w_first } else { 0.0 };
    let gyro_direction = if w_last < w_first { GyroDirection::Drop } else { GyroDirection::Surge };

    let (dur_first, dur_last) = thirds(&durations, third);
    let i_t = rel_change(dur_first, dur_last);

    let (jerk_first, jerk_last) = thirds(&jerk, third);
    let i_j = rel_change(jerk_first, jerk_last);

    let (shaky_first, shaky_last) = if has_shakiness { thirds(&shakiness, third) } else { (0.0, 0.0) };
    let i_s = if has_shakiness { rel_change(shaky_first, shaky_last) } else { 0.0 };

    // ── sammensatt score ──
    let w = params.weights.normalized();
    let clamped = [d_omega.max(0.0), i_t.max(0.0), i_j.max(0.0), i_s.max(0.0)];
    let mut composite =
        w.omega * clamped[0] + w.tempo * clamped[1] + w.jerk * clamped[2] + w.shaky * clamped[3];
    let worst = clamped.iter().copied().fold(0.0, f64::max);
    if worst > params.boost_threshold {
        composite += (worst - params.boost_threshold) * params.boost_multiplier;
    }
    let composite = composite.min(1.0);
    let fatigue_score = (composite * 100.0).clamp(0.0, 100.0);
    let fatigue_level = FatigueLevel::from_score(fatigue_score);

    log::debug!(
        "fatigue: D_omega={:.4} I_T={:.4} I_J={:.4} I_S={:.4} worst={:.4} -> {:.1}",
        d_omega,
        i_t,
        i_j,
        i_s,
        worst,
        fatigue_score
    );

    // ── konsistens og trender ──
    let cons = ConsistencyBreakdown {
        rom: consistency(&roms, params.cv_scale),
        smoothness: consistency(&smooth, params.cv_scale),
        duration: consistency(&durations, params.cv_scale),
        peak: consistency(&peaks, params.cv_scale),
        gyro: if has_gyro { consistency(&gyro_peaks, params.cv_scale) } else { 0.0 },
    };
    let consistency_score = (cons.rom + cons.smoothness + cons.duration + cons.peak) / 4.0;

    let trends = TrendBreakdown {
        rom: trend_percent(&roms),
        smoothness: trend_percent(&smooth),
        duration: trend_percent(&durations),
        peak: trend_percent(&peaks),
        gyro: if has_gyro { trend_percent(&gyro_peaks) } else { 0.0 },
    };

    // ── tidlig mot sent ──
    let (rom_first, rom_last) = thirds(&roms, third);
    let (sm_first, sm_last) = thirds(&smooth, third);
    let (pk_first, pk_last) = thirds(&peaks, third);
    let (g_first, g_last) = if has_gyro { thirds(&gyro_peaks, third) } else { (0.0, 0.0) };

    let early_vs_late = EarlyVsLate {
        rom_change_percent: rel_change(rom_first, rom_last) * 100.0,
        smoothness_degradation_percent: rel_drop(sm_first, sm_last) * 100.0,
        duration_increase_percent: i_t * 100.0,
        peak_degradation_percent: rel_drop(pk_first, pk_last) * 100.0,
        gyro_peak_change_percent: rel_change(g_first, g_last) * 100.0,
        jerk_increase_percent: i_j * 100.0,
        shakiness_increase_percent: i_s * 100.0,
        avg_gyro_peak_first: g_first,
        avg_gyro_peak_last: g_last,
        avg_shakiness_first: shaky_first,
        avg_shakiness_last: shaky_last,
        avg_rom_first: rom_first,
        avg_rom_last: rom_last,
        avg_smoothness_first: sm_first,
        avg_smoothness_last: sm_last,
        avg_duration_first_ms: dur_first,
        avg_duration_last_ms: dur_last,
    };

    let mut report = SessionFatigueReport {
        fatigue_score,
        fatigue_level,
        d_omega,
        i_t,
        i_j,
        i_s,
        gyro_direction,
        has_gyro,
        consistency_score,
        consistency: cons,
        trends,
        early_vs_late,
        session_quality: fatigue_level.session_quality().to_string(),
        consistency_rating: consistency_rating(consistency_score).to_string(),
        key_findings: Vec::new(),
        n_reps_analyzed: n,
    };
    report.key_findings = key_findings(&report, has_shakiness);
    Outcome::Ok(report)
}

/// Regelbaserte funn, faste terskler.
fn key_findings(r: &SessionFatigueReport, has_shakiness: bool) -> Vec<String> {
    let mut out = Vec::new();

    if r.fatigue_score < 10.0 {
        out.push("Excellent fatigue resistance: stable speed and jerk throughout".to_string());
    } else if r.fatigue_score > 45.0 {
        out.push("Significant fatigue detected: movement quality degraded notably".to_string());
    }

    if r.has_gyro && r.d_omega > 0.15 {
        match r.gyro_direction {
            GyroDirection::Surge => out.push(format!(
                "Peak angular velocity surged {:.1}%: compensatory swinging",
                r.d_omega * 100.0
            )),
            _ => out.push(format!(
                "Peak angular velocity dropped {:.1}%: muscles slowing",
                r.d_omega * 100.0
            )),
        }
    } else if r.has_gyro && r.d_omega < 0.05 {
        out.push(format!("Angular velocity stable (only {:.1}% change)", r.d_omega * 100.0));
    }

    if has_shakiness && r.i_s > 0.20 {
        out.push(format!(
            "Within-rep shakiness increased {:.1}%: losing motor control",
            r.i_s * 100.0
        ));
    } else if has_shakiness && r.i_s < 0.05 {
        out.push("Movement shakiness stable throughout session".to_string());
    }

    if r.i_t > 0.15 {
        out.push(format!("Rep duration increased {:.1}%: slowing down", r.i_t * 100.0));
    }
    if r.i_j > 0.20 {
        out.push(format!(
            "Jerk increased {:.1}%: movement becoming less smooth",
            r.i_j * 100.0
        ));
    }

    if r.consistency_score > 85.0 {
        out.push("Highly consistent, controlled movements".to_string());
    } else if r.consistency_score < 60.0 {
        out.push("High variability: erratic rep execution".to_string());
    }

    let rom = r.early_vs_late.rom_change_percent;
    if rom < -20.0 {
        out.push(format!(
            "ROM decreased by {:.1}% (early vs late reps): losing range",
            rom.abs()
        ));
    } else if rom > 20.0 {
        out.push(format!(
            "ROM increased by {:.1}% (early vs late reps): possible compensatory swinging",
            rom
        ));
    }

    if out.is_empty() {
        out.push("Moderate performance with mixed indicators".to_string());
    }
    out
}
