use std::fmt::Write as _;

use crate::analyzer::SessionAnalysis;

/// Tekstrapport for én analysert økt.
pub fn render_session_report(a: &SessionAnalysis) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    write_report(&mut out, a)?;
    Ok(out)
}

pub fn print_session_report(a: &SessionAnalysis) -> std::fmt::Result {
    print!("{}", render_session_report(a)?);
    Ok(())
}

fn write_report(out: &mut String, a: &SessionAnalysis) -> std::fmt::Result {
    let seg = a.segmentation.value();
    let f = a.fatigue.value();
    let s = &a.summary;

    writeln!(out, "--- Session Report ---")?;
    if let Some(id) = &a.meta.session_id {
        writeln!(out, "Session: {}", id)?;
    }
    if let Some(ex) = a.meta.exercise {
        writeln!(out, "Exercise: {}", ex)?;
    }
    if let Some(t) = a.meta.start_time_utc {
        writeln!(out, "Started: {}", t.format("%Y-%m-%d %H:%M:%S UTC"))?;
    }
    writeln!(
        out,
        "Segmentation: {} ({}) on {}, {} rep(s)",
        seg.strategy.label(),
        a.segmentation.status().as_str(),
        seg.channel.name(),
        seg.segments.len()
    )?;
    if seg.trailing_excluded > 0 {
        writeln!(out, "Trailing samples excluded: {}", seg.trailing_excluded)?;
    }

    writeln!(out)?;
    writeln!(out, "Session quality:    {}", f.session_quality)?;
    writeln!(out, "Consistency rating: {}", f.consistency_rating)?;
    writeln!(
        out,
        "Fatigue:            {} ({:.1}/100)",
        f.fatigue_level.as_str(),
        f.fatigue_score
    )?;
    writeln!(out, "Consistency:        {:.1}%", f.consistency_score)?;

    writeln!(out)?;
    writeln!(out, "Reps analysed:      {}", s.total_reps)?;
    writeln!(out, "Total rep time:     {:.1} s", s.total_duration_ms / 1000.0)?;
    writeln!(out, "Avg rep duration:   {:.2} s", s.avg_duration_ms / 1000.0)?;
    if s.has_rom_degrees {
        writeln!(out, "Avg ROM:            {:.1} deg", s.avg_rom_degrees)?;
    } else {
        writeln!(out, "Avg ROM:            {:.2} units", s.avg_rom)?;
    }
    writeln!(out, "Avg smoothness:     {:.1}%", s.avg_smoothness)?;

    if f.n_reps_analyzed >= crate::fatigue::MIN_FATIGUE_REPS {
        writeln!(out)?;
        writeln!(
            out,
            "D_omega={:.3} ({:?})  I_T={:.3}  I_J={:.3}  I_S={:.3}",
            f.d_omega, f.gyro_direction, f.i_t, f.i_j, f.i_s
        )?;
    }

    writeln!(out)?;
    writeln!(out, "rep  dur(ms)  rom(deg)  smooth  conc/ecc  gyro_peak  status")?;
    for r in &a.reps {
        let v = r.features.value();
        writeln!(
            out,
            "{:>3}  {:>7.0}  {:>8.1}  {:>6.1}  {:>8.2}  {:>9.3}  {}",
            r.segment.rep,
            v.duration_ms,
            v.rom.rom_degrees,
            v.smoothness.smoothness_score,
            v.phase.concentric_eccentric_ratio,
            v.gyro.gyro_peak,
            r.features.status().as_str()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Findings:")?;
    for k in &f.key_findings {
        writeln!(out, "  - {}", k)?;
    }
    Ok(())
}
