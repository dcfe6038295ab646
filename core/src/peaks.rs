use crate::models::ExerciseProfile;

/// Terskler for ekstremsøk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakParams {
    /// Minste avstand i samples mellom to beholdte topper (1 = ingen filtrering)
    pub distance: usize,
    pub prominence: f64,
}

/// Lokale maksima med avstands- og prominensfilter.
///
/// * strenge maksima; platåer gir midtre sample, endepunkter er aldri topper
/// * avstandsfilteret kjøres først: høyere topper har prioritet og naboer
///   nærmere enn `distance` fjernes
/// * deretter prominens ≥ terskel, målt mot hele signalet (ubegrenset vindu)
///
/// Indeksene returneres stigende.
pub fn find_peaks(signal: &[f64], params: PeakParams) -> Vec<usize> {
    let mut peaks = local_maxima(signal);
    if params.distance > 1 && peaks.len() > 1 {
        peaks = select_by_distance(signal, &peaks, params.distance);
    }
    peaks.retain(|&p| prominence(signal, p) >= params.prominence);
    peaks
}

/// Daler = topper i det negerte signalet.
pub fn find_valleys(signal: &[f64], params: PeakParams) -> Vec<usize> {
    let neg: Vec<f64> = signal.iter().map(|x| -x).collect();
    find_peaks(&neg, params)
}

/// Adaptiv prominens: max(spenn·faktor, std·faktor, gulv).
pub fn adaptive_prominence(signal: &[f64], profile: &ExerciseProfile) -> f64 {
    let (range, std) = range_and_std(signal);
    let p = (range * profile.prominence_factor)
        .max(std * profile.std_factor)
        .max(profile.min_prominence_floor);
    log::debug!(
        "prominence: range={:.4} std={:.4} -> {:.4} (floor {:.4})",
        range,
        std,
        p,
        profile.min_prominence_floor
    );
    p
}

/// Spenn (max−min) og populasjons-standardavvik. (0, 0) for tomt signal.
pub fn range_and_std(signal: &[f64]) -> (f64, f64) {
    if signal.is_empty() {
        return (0.0, 0.0);
    }
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    let mut sum = 0.0;
    for &x in signal {
        lo = lo.min(x);
        hi = hi.max(x);
        sum += x;
    }
    let n = signal.len() as f64;
    let mean = sum / n;
    let var = signal.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (hi - lo, var.sqrt())
}

fn local_maxima(x: &[f64]) -> Vec<usize> {
    let n = x.len();
    let mut out = Vec::new();
    if n < 3 {
        return out;
    }
    let mut i = 1;
    while i < n - 1 {
        if x[i - 1] < x[i] {
            // hopp over et eventuelt platå
            let mut ahead = i + 1;
            while ahead < n - 1 && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                out.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    out
}

fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let m = peaks.len();
    let mut order: Vec<usize> = (0..m).collect();
    // stabil sortering stigende på høyde; vi går baklengs (høyest først)
    order.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    let mut keep = vec![true; m];
    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < m && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Prominens for toppen i `peak`: høyde over det høyeste av de to laveste
/// punktene man når før signalet stiger over toppen på hver side.
pub(crate) fn prominence(x: &[f64], peak: usize) -> f64 {
    let h = x[peak];

    let mut left_min = h;
    for &v in x[..peak].iter().rev() {
        if v > h {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = h;
    for &v in &x[peak + 1..] {
        if v > h {
            break;
        }
        right_min = right_min.min(v);
    }

    h - left_min.max(right_min)
}
