use ordered_float::OrderedFloat;

use crate::types::ChannelStats;

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Populasjons-standardavvik (ddof = 0).
pub fn std_pop(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    (xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64).sqrt()
}

pub fn rms(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    (xs.iter().map(|x| x * x).sum::<f64>() / xs.len() as f64).sqrt()
}

/// Persentil med lineær interpolasjon mellom nærmeste rangerte verdier.
/// `sorted` må være sortert stigende og ikke tom.
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn percentile(xs: &[f64], q: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut v: Vec<OrderedFloat<f64>> = xs.iter().copied().map(OrderedFloat).collect();
    v.sort();
    let sorted: Vec<f64> = v.into_iter().map(|x| x.0).collect();
    percentile_sorted(&sorted, q)
}

/// Skjevhet, bias-korrigert (G1). Krever minst 3 samples.
pub fn skewness(xs: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let m = mean(xs);
    let m2 = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / nf;
    let m3 = xs.iter().map(|x| (x - m).powi(3)).sum::<f64>() / nf;
    if m2 <= f64::EPSILON * m.abs().max(1.0) {
        return Some(0.0);
    }
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0))
}

/// Excess-kurtose, bias-korrigert (G2). Krever minst 4 samples.
pub fn kurtosis(xs: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 4 {
        return None;
    }
    let nf = n as f64;
    let m = mean(xs);
    let s2 = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    let s4 = xs.iter().map(|x| (x - m).powi(4)).sum::<f64>();
    if s2 <= f64::EPSILON * m.abs().max(1.0) {
        return Some(0.0);
    }
    let numer = nf * (nf + 1.0) * (nf - 1.0) * s4;
    let denom = (nf - 2.0) * (nf - 3.0) * s2 * s2;
    let adj = 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0));
    Some(numer / denom - adj)
}

/// Full deskriptiv statistikk for én kanal. Tom serie → nuller.
pub fn channel_stats(xs: &[f64]) -> ChannelStats {
    if xs.is_empty() {
        return ChannelStats::default();
    }

    let mut sorted: Vec<OrderedFloat<f64>> = xs.iter().copied().map(OrderedFloat).collect();
    sorted.sort();
    let sorted: Vec<f64> = sorted.into_iter().map(|x| x.0).collect();

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let p25 = percentile_sorted(&sorted, 25.0);
    let p75 = percentile_sorted(&sorted, 75.0);

    let (diff_mean, diff_std, diff_max) = if xs.len() >= 2 {
        let d: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let dmax = d.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
        (Some(mean(&d)), Some(std_pop(&d)), Some(dmax))
    } else {
        (None, None, None)
    };

    // første forekomst av maks
    let peak_idx = xs
        .iter()
        .enumerate()
        .fold(0usize, |best, (i, &x)| if x > xs[best] { i } else { best });

    ChannelStats {
        mean: mean(xs),
        std: std_pop(xs),
        min,
        max,
        range: max - min,
        median: percentile_sorted(&sorted, 50.0),
        p25,
        p75,
        iqr: p75 - p25,
        skew: skewness(xs),
        kurtosis: kurtosis(xs),
        energy: xs.iter().map(|x| x * x).sum(),
        rms: rms(xs),
        diff_mean,
        diff_std,
        diff_max,
        peak_position: peak_idx as f64 / xs.len() as f64,
        peak_value: xs[peak_idx],
    }
}

/// OLS-stigning av `ys` mot indeks 0..n. 0 ved under to punkter.
pub fn ols_slope(ys: &[f64]) -> f64 {
    let n = ys.len();
    if n < 2 {
        return 0.0;
    }
    let xm = (n - 1) as f64 / 2.0;
    let ym = mean(ys);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - xm;
        sxy += dx * (y - ym);
        sxx += dx * dx;
    }
    if sxx == 0.0 { 0.0 } else { sxy / sxx }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_interpolate() {
        let xs = [4.0, 1.0, 3.0, 2.0];
        assert!((percentile(&xs, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile(&xs, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&xs, 75.0) - 3.25).abs() < 1e-12);
    }

    #[test]
    fn skew_and_kurtosis_reference_values() {
        // Referanse: bias-korrigerte verdier for [1, 2, 3, 4, 10]
        let xs = [1.0, 2.0, 3.0, 4.0, 10.0];
        let s = skewness(&xs).unwrap();
        let k = kurtosis(&xs).unwrap();
        assert!((s - 1.697056).abs() < 1e-5, "skew {}", s);
        assert!((k - 3.152).abs() < 1e-9, "kurt {}", k);
        assert_eq!(skewness(&[1.0, 2.0]), None);
        assert_eq!(kurtosis(&[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn constant_series_has_zero_shape() {
        let xs = [2.0; 6];
        assert_eq!(skewness(&xs), Some(0.0));
        assert_eq!(kurtosis(&xs), Some(0.0));
        let st = channel_stats(&xs);
        assert_eq!(st.std, 0.0);
        assert_eq!(st.diff_max, Some(0.0));
        assert_eq!(st.peak_position, 0.0);
    }

    #[test]
    fn slope_of_line() {
        let ys: Vec<f64> = (0..10).map(|i| 3.0 + 0.5 * i as f64).collect();
        assert!((ols_slope(&ys) - 0.5).abs() < 1e-12);
        assert_eq!(ols_slope(&[1.0]), 0.0);
    }
}
