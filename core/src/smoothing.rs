/// Polynomgrad for Savitzky–Golay-glattingen.
pub const SAVGOL_POLYORDER: usize = 3;

/// Savitzky–Golay-glatting (lokal polynomtilpasning) med oddetalls vindu.
///
/// Kantene håndteres ved å tilpasse polynomet til første/siste hele vindu og
/// evaluere det der (interp-modus), slik at lengden beholdes.
/// Signal som ikke er lengre enn vinduet returneres uendret.
pub fn savgol_smooth(signal: &[f64], window: usize, polyorder: usize) -> Vec<f64> {
    let n = signal.len();
    let w = if window % 2 == 0 { window + 1 } else { window };
    if n <= w || polyorder >= w {
        return signal.to_vec();
    }

    let hat = match projection_matrix(w, polyorder) {
        Some(h) => h,
        None => {
            log::warn!("savgol: singular fit for window={} order={}, passing through", w, polyorder);
            return signal.to_vec();
        }
    };

    let half = w / 2;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        // (start på vinduet, posisjon i vinduet vi evaluerer)
        let (start, pos) = if i < half {
            (0, i)
        } else if i >= n - half {
            (n - w, i - (n - w))
        } else {
            (i - half, half)
        };
        let row = &hat[pos];
        let y: f64 = row
            .iter()
            .zip(&signal[start..start + w])
            .map(|(c, x)| c * x)
            .sum();
        out.push(y);
    }
    out
}

/// Glatter en amplitudekanal før ekstremsøk. Brukes kun til deteksjon;
/// rapporterte verdier leses fra originalsignalet.
pub fn precondition(signal: &[f64], window: usize) -> Vec<f64> {
    savgol_smooth(signal, window, SAVGOL_POLYORDER)
}

/// H = V (VᵀV)⁻¹ Vᵀ for et vindu med `w` punkter; rad p gir vektene som
/// evaluerer minste-kvadraters-polynomet i punkt p.
fn projection_matrix(w: usize, order: usize) -> Option<Vec<Vec<f64>>> {
    let m = order + 1;
    let half = (w / 2) as f64;
    // Skalerte abscisser i [-1, 1] for bedre kondisjon (H er uavhengig av skalering)
    let v: Vec<Vec<f64>> = (0..w)
        .map(|j| {
            let x = (j as f64 - half) / half;
            (0..m).map(|k| x.powi(k as i32)).collect()
        })
        .collect();

    let mut vtv = vec![vec![0.0; m]; m];
    for row in &v {
        for a in 0..m {
            for b in 0..m {
                vtv[a][b] += row[a] * row[b];
            }
        }
    }
    let inv = invert(vtv)?;

    let mut hat = vec![vec![0.0; w]; w];
    for p in 0..w {
        // q = v[p] · (VᵀV)⁻¹
        let q: Vec<f64> = (0..m)
            .map(|b| (0..m).map(|a| v[p][a] * inv[a][b]).sum())
            .collect();
        for j in 0..w {
            hat[p][j] = (0..m).map(|b| q[b] * v[j][b]).sum();
        }
    }
    Some(hat)
}

/// Gauss-Jordan med delvis pivotering. `None` hvis matrisen er singulær.
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let m = a.len();
    let mut inv: Vec<Vec<f64>> = (0..m)
        .map(|i| (0..m).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..m {
        let pivot = (col..m).max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let d = a[col][col];
        for j in 0..m {
            a[col][j] /= d;
            inv[col][j] /= d;
        }
        for r in 0..m {
            if r == col {
                continue;
            }
            let f = a[r][col];
            if f == 0.0 {
                continue;
            }
            for j in 0..m {
                a[r][j] -= f * a[col][j];
                inv[r][j] -= f * inv[col][j];
            }
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hat_rows_sum_to_one() {
        // Konstant signal skal gjengis eksakt i alle posisjoner
        let h = projection_matrix(11, 3).unwrap();
        for row in &h {
            let s: f64 = row.iter().sum();
            assert!((s - 1.0).abs() < 1e-9, "row sum {}", s);
        }
    }

    #[test]
    fn cubic_is_preserved_including_edges() {
        let xs: Vec<f64> = (0..40)
            .map(|i| {
                let t = i as f64 * 0.1;
                0.5 * t * t * t - 2.0 * t * t + t + 3.0
            })
            .collect();
        let out = savgol_smooth(&xs, 11, 3);
        for (a, b) in xs.iter().zip(&out) {
            assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
    }

    #[test]
    fn centre_coefficients_match_reference() {
        // Tabellverdier for vindu 7, grad 3: [-2, 3, 6, 7, 6, 3, -2] / 21
        let h = projection_matrix(7, 3).unwrap();
        let expected = [-2.0, 3.0, 6.0, 7.0, 6.0, 3.0, -2.0];
        for (c, e) in h[3].iter().zip(expected) {
            assert!((c - e / 21.0).abs() < 1e-9, "{} vs {}", c, e / 21.0);
        }
    }

    #[test]
    fn short_signal_passes_through() {
        let xs = vec![1.0, 5.0, 2.0, 8.0];
        assert_eq!(precondition(&xs, 11), xs);
        let xs11: Vec<f64> = (0..11).map(|i| (i % 3) as f64).collect();
        assert_eq!(precondition(&xs11, 11), xs11, "n == window is not smoothed");
    }

    #[test]
    fn noise_is_damped() {
        let xs: Vec<f64> = (0..60).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let out = precondition(&xs, 11);
        assert_eq!(out.len(), xs.len());
        let mid_energy: f64 = out[10..50].iter().map(|x| x * x).sum::<f64>() / 40.0;
        assert!(mid_energy < 0.2, "alternating noise should be damped, got {}", mid_energy);
    }
}
