use ordered_float::OrderedFloat;

use crate::error::Outcome;
use crate::models::ExerciseProfile;
use crate::peaks::{adaptive_prominence, find_peaks, find_valleys, PeakParams};
use crate::smoothing::precondition;
use crate::types::{Channel, RepSegment, Segmentation, SegmentationStrategy, SensorSample};

/// Skaleringene som prøves på prominensen før toppdeteksjon tas i bruk.
pub const RETRY_SCALES: [f64; 3] = [0.5, 0.25, 0.1];

/// Andel av rep-spennet det søkes rundt hver merket rep-slutt i guidet fallback.
const GUIDED_WINDOW_FRACTION: f64 = 0.2;
const GUIDED_WINDOW_MIN: usize = 10;

/// Median samplingsintervall (ms). `None` under to samples.
pub fn median_dt(timestamps: &[f64]) -> Option<f64> {
    if timestamps.len() < 2 {
        return None;
    }
    let mut dts: Vec<OrderedFloat<f64>> = timestamps
        .windows(2)
        .map(|w| OrderedFloat(w[1] - w[0]))
        .collect();
    dts.sort();
    let m = dts.len();
    let med = if m % 2 == 1 {
        dts[m / 2].0
    } else {
        (dts[m / 2 - 1].0 + dts[m / 2].0) / 2.0
    };
    Some(med)
}

/// Alt en strategi trenger for å foreslå grenser. Bygges én gang per økt.
struct SignalContext<'a> {
    smoothed: &'a [f64],
    timestamps: &'a [f64],
    /// Merkede rep-nummer per sample (0 = umerket); tom hvis ingen merking
    hints: Vec<u32>,
    prominence: f64,
    distance: usize,
    min_ms: f64,
    max_ms: f64,
}

impl SignalContext<'_> {
    fn span_ok(&self, from: usize, to: usize) -> bool {
        let d = self.timestamps[to] - self.timestamps[from];
        d >= self.min_ms && d <= self.max_ms
    }
}

/// Stigen i rekkefølge. Første strategi med minst én godtatt grense etter
/// start vinner;
/// `Degenerate` ligger utenfor og brukes når alle feiler.
fn ladder() -> Vec<SegmentationStrategy> {
    let mut out = vec![SegmentationStrategy::Normal];
    out.extend(RETRY_SCALES.iter().map(|&scale| SegmentationStrategy::Retry { scale }));
    out.push(SegmentationStrategy::PeakFallback);
    out.push(SegmentationStrategy::GuidedFallback);
    out
}

/// Prominensen en strategi faktisk kjører med.
fn strategy_prominence(strategy: SegmentationStrategy, base: f64) -> f64 {
    match strategy {
        SegmentationStrategy::Retry { scale } => base * scale,
        SegmentationStrategy::PeakFallback => base * 0.5,
        _ => base,
    }
}

/// Rå kandidatgrenser (stigende) for en strategi, før varighetsfilteret.
fn candidates(strategy: SegmentationStrategy, ctx: &SignalContext) -> Option<Vec<usize>> {
    let params = PeakParams {
        distance: ctx.distance,
        prominence: strategy_prominence(strategy, ctx.prominence),
    };
    match strategy {
        SegmentationStrategy::Normal | SegmentationStrategy::Retry { .. } => {
            Some(find_valleys(ctx.smoothed, params))
        }
        // Noen øvelser har invertert mønster: bruk topper som grenser
        SegmentationStrategy::PeakFallback => Some(find_peaks(ctx.smoothed, params)),
        SegmentationStrategy::GuidedFallback => guided_candidates(ctx),
        SegmentationStrategy::Degenerate => None,
    }
}

/// For hver merket rep: argmin av glattet signal i et vindu rundt rep'ens slutt.
fn guided_candidates(ctx: &SignalContext) -> Option<Vec<usize>> {
    if ctx.hints.is_empty() {
        return None;
    }
    let n = ctx.smoothed.len();

    // rep-nummer → (første, siste) posisjon
    let mut spans: std::collections::BTreeMap<u32, (usize, usize)> = Default::default();
    for (i, &h) in ctx.hints.iter().enumerate() {
        if h == 0 {
            continue;
        }
        spans
            .entry(h)
            .and_modify(|e| e.1 = i)
            .or_insert((i, i));
    }
    if spans.is_empty() {
        return None;
    }

    let mut out = Vec::new();
    let mut last = 0usize;
    for (first, end) in spans.into_values() {
        let w = ((((end - first) as f64) * GUIDED_WINDOW_FRACTION) as usize).max(GUIDED_WINDOW_MIN);
        let lo = end.saturating_sub(w);
        let hi = (end + w).min(n);
        let window = &ctx.smoothed[lo..hi];
        if window.len() <= 3 {
            continue;
        }
        let Some(local) = argmin(window) else { continue };
        let idx = lo + local;
        if idx > last {
            out.push(idx);
            last = idx;
        }
    }
    Some(out)
}

/// Varighetsfilter: start i 0, godta kandidat c hvis tiden siden forrige
/// godtatte grense ligger i [min, max].
fn accept_by_duration(cands: &[usize], ctx: &SignalContext) -> Vec<usize> {
    let mut accepted = vec![0usize];
    for &c in cands {
        let last = accepted[accepted.len() - 1];
        if c > last && ctx.span_ok(last, c) {
            accepted.push(c);
        }
    }
    accepted
}

/// Halebehandling. Returnerer antall samples etter siste grense som ikke
/// ble en rep (0 hvis øktslutt `n` lukket siste rep).
fn close_tail(accepted: &mut Vec<usize>, ctx: &SignalContext, prominence: f64) -> usize {
    let n = ctx.smoothed.len();
    let last = accepted[accepted.len() - 1];

    // Let etter den egentlige siste dalen i resten av signalet
    if last != n - 1 && ctx.timestamps[n - 1] - ctx.timestamps[last] >= ctx.min_ms {
        let rest = &ctx.smoothed[last..];
        if rest.len() > ctx.distance {
            let local = find_valleys(
                rest,
                PeakParams {
                    distance: (ctx.distance / 2).max(1),
                    prominence: prominence * 0.5,
                },
            );
            if let Some(&v) = local.last() {
                let idx = last + v;
                if ctx.span_ok(last, idx) {
                    log::debug!("tail: terminal valley at {}", idx);
                    accepted.push(idx);
                }
            }
        }
    }

    let last = accepted[accepted.len() - 1];
    if last < n - 1 && ctx.span_ok(last, n - 1) {
        accepted.push(n);
        0
    } else {
        n - last
    }
}

/// Grensene en strategi godtar. `None` hvis ingen detekterte kandidater
/// overlever varighetsfilteret; halen og øktslutten teller ikke.
fn run_strategy(strategy: SegmentationStrategy, ctx: &SignalContext) -> Option<Vec<usize>> {
    let cands = candidates(strategy, ctx)?;
    let accepted = accept_by_duration(&cands, ctx);
    log::debug!(
        "{}: {} candidates, {} accepted",
        strategy.label(),
        cands.len(),
        accepted.len() - 1
    );
    (accepted.len() >= 2).then_some(accepted)
}

/// Deler økten i reps.
///
/// Returnerer alltid en komplett `Segmentation`; `SegmentationFailure` betyr
/// at hele økten ble én degenerert rep (eller at økten var tom).
pub fn segment_session(samples: &[SensorSample], profile: &ExerciseProfile) -> Outcome<Segmentation> {
    let n = samples.len();
    let (channel, signal) = resolve_signal(samples, profile.signal_channel);
    let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp_ms).collect();
    let min_distance = profile.min_distance_samples(median_dt(&timestamps));

    if n == 0 {
        log::warn!("segmentation: empty session");
        return Outcome::SegmentationFailure(Segmentation {
            strategy: SegmentationStrategy::Degenerate,
            channel,
            boundaries: Vec::new(),
            segments: Vec::new(),
            min_prominence: profile.min_prominence_floor,
            min_distance,
            leading_excluded: 0,
            trailing_excluded: 0,
        });
    }

    let smoothed = precondition(&signal, profile.effective_window());
    let prominence = adaptive_prominence(&smoothed, profile);
    let hints: Vec<u32> = if samples.iter().any(|s| s.rep_hint.unwrap_or(0) > 0) {
        samples.iter().map(|s| s.rep_hint.unwrap_or(0)).collect()
    } else {
        Vec::new()
    };

    let ctx = SignalContext {
        smoothed: &smoothed,
        timestamps: &timestamps,
        hints,
        prominence,
        distance: min_distance,
        min_ms: profile.min_rep_duration_ms,
        max_ms: profile.max_rep_duration_ms,
    };
    log::debug!(
        "segmentation: n={} channel={} prominence={:.4} distance={} duration=[{}, {}] ms",
        n,
        channel.name(),
        prominence,
        min_distance,
        ctx.min_ms,
        ctx.max_ms
    );

    for strategy in ladder() {
        if let Some(mut boundaries) = run_strategy(strategy, &ctx) {
            // Halen lukkes kun for strategien som vant
            let trailing = close_tail(&mut boundaries, &ctx, strategy_prominence(strategy, prominence));
            if strategy != SegmentationStrategy::Normal {
                log::warn!("segmentation: fell back to {} ({:?})", strategy.label(), strategy);
            }
            let segments = build_segments(&boundaries, &signal, &smoothed, &timestamps);
            log::info!(
                "segmentation: strategy={} reps={} trailing_excluded={}",
                strategy.label(),
                segments.len(),
                trailing
            );
            return Outcome::Ok(Segmentation {
                strategy,
                channel,
                leading_excluded: boundaries[0],
                boundaries,
                segments,
                min_prominence: strategy_prominence(strategy, prominence),
                min_distance,
                trailing_excluded: trailing,
            });
        }
    }

    log::warn!("segmentation: no strategy produced a rep, treating session as one degenerate rep");
    let boundaries = vec![0, n];
    let segments = build_segments(&boundaries, &signal, &smoothed, &timestamps);
    Outcome::SegmentationFailure(Segmentation {
        strategy: SegmentationStrategy::Degenerate,
        channel,
        boundaries,
        segments,
        min_prominence: prominence,
        min_distance,
        leading_excluded: 0,
        trailing_excluded: 0,
    })
}

/// Kanalen fra profilen, eller filteredMag (→ accelMag) hvis den mangler.
fn resolve_signal(samples: &[SensorSample], wanted: Channel) -> (Channel, Vec<f64>) {
    if let Some(v) = wanted.series(samples) {
        return (wanted, v);
    }
    let (used, v) = Channel::FilteredMag.resolve_series(samples);
    if !samples.is_empty() {
        log::warn!(
            "segmentation: channel {} missing, using {}",
            wanted.name(),
            used.name()
        );
    }
    (used, v)
}

/// Bygger rep-segmenter fra par av grenser `[b_i, b_{i+1})`.
/// Toppen søkes i glattet signal; verdiene leses fra originalkanalen.
pub fn build_segments(
    boundaries: &[usize],
    signal: &[f64],
    smoothed: &[f64],
    timestamps: &[f64],
) -> Vec<RepSegment> {
    let n = signal.len();
    boundaries
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0])
        .map(|(i, w)| {
            let (start, stop) = (w[0], w[1]);
            let close = stop.min(n - 1);
            let peak_idx = start + argmax(&smoothed[start..stop]).unwrap_or(0);
            let start_time_ms = timestamps[start];
            let end_time_ms = timestamps[close];
            RepSegment {
                rep: (i + 1) as u32,
                start_idx: start,
                end_idx: stop - 1,
                start_time_ms,
                end_time_ms,
                duration_ms: end_time_ms - start_time_ms,
                peak_idx,
                peak_time_ms: timestamps[peak_idx],
                peak_value: signal[peak_idx],
                valley_value: signal[start],
                amplitude: signal[peak_idx] - signal[start],
            }
        })
        .collect()
}

/// Første indeks med største verdi.
pub(crate) fn argmax(xs: &[f64]) -> Option<usize> {
    xs.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &x)| match best {
            Some((_, b)) if b >= x => best,
            _ => Some((i, x)),
        })
        .map(|(i, _)| i)
}

/// Første indeks med minste verdi.
pub(crate) fn argmin(xs: &[f64]) -> Option<usize> {
    xs.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &x)| match best {
            Some((_, b)) if b <= x => best,
            _ => Some((i, x)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(smoothed: &'a [f64], ts: &'a [f64]) -> SignalContext<'a> {
        SignalContext {
            smoothed,
            timestamps: ts,
            hints: Vec::new(),
            prominence: 0.5,
            distance: 5,
            min_ms: 800.0,
            max_ms: 8000.0,
        }
    }

    #[test]
    fn ladder_order() {
        let labels: Vec<&str> = ladder().iter().map(|s| s.label()).collect();
        assert_eq!(
            labels,
            vec!["normal", "retry", "retry", "retry", "peak_fallback", "guided_fallback"]
        );
    }

    #[test]
    fn acceptance_skips_too_short_and_too_long() {
        let ts: Vec<f64> = (0..100).map(|i| i as f64 * 100.0).collect();
        let sig = vec![0.0; 100];
        let c = ctx(&sig, &ts);
        // 5 → 500 ms (for kort), 12 → 1200 ms ok, 20 → 800 ms ok, 99 → 7900 ms ok
        let acc = accept_by_duration(&[5, 12, 20, 99], &c);
        assert_eq!(acc, vec![0, 12, 20, 99]);
        // 95 ligger 9500 ms etter 0 → for lang
        let acc = accept_by_duration(&[95], &c);
        assert_eq!(acc, vec![0]);
    }

    fn cosine(n: usize) -> Vec<f64> {
        // periode 20 samples: daler i 10 og 30, topp i 20
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 20.0).cos())
            .collect()
    }

    #[test]
    fn tail_finds_terminal_valley_and_closes_at_end() {
        let ts: Vec<f64> = (0..40).map(|i| i as f64 * 100.0).collect();
        let sig = cosine(40);
        let c = ctx(&sig, &ts);
        let mut acc = vec![0, 10];
        let trailing = close_tail(&mut acc, &c, c.prominence);
        // 30 → 2000 ms etter 10; 39 ligger 900 ms etter 30 → siste rep lukkes i n
        assert_eq!(acc, vec![0, 10, 30, 40]);
        assert_eq!(trailing, 0);
    }

    #[test]
    fn tail_excludes_too_short_remainder() {
        let ts: Vec<f64> = (0..36).map(|i| i as f64 * 100.0).collect();
        let sig = cosine(36);
        let c = ctx(&sig, &ts);
        let mut acc = vec![0, 10];
        let trailing = close_tail(&mut acc, &c, c.prominence);
        // bare 500 ms igjen etter dalen i 30
        assert_eq!(acc, vec![0, 10, 30]);
        assert_eq!(trailing, 6);
    }

    #[test]
    fn strategy_without_accepted_candidates_fails() {
        let ts: Vec<f64> = (0..40).map(|i| i as f64 * 100.0).collect();
        // monotont: ingen daler, bare øktslutten ville gitt en rep
        let sig: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let c = ctx(&sig, &ts);
        assert_eq!(run_strategy(SegmentationStrategy::Normal, &c), None);
    }

    #[test]
    fn argmax_argmin_first_occurrence() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 0.0]), Some(1));
        assert_eq!(argmin(&[2.0, 0.0, 1.0, 0.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn median_dt_even_and_odd() {
        assert_eq!(median_dt(&[0.0]), None);
        assert_eq!(median_dt(&[0.0, 10.0, 30.0]), Some(15.0));
        assert_eq!(median_dt(&[0.0, 10.0, 20.0, 50.0]), Some(10.0));
    }
}
