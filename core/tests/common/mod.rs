#![allow(dead_code)]

use std::f64::consts::PI;

use liftgraph_core::SensorSample;

pub const DT_MS: f64 = 20.0;
pub const REP_MS: f64 = 2000.0;
pub const GYRO_AMP: f64 = 3.0;

/// Hevet cosinus 0 → 1 → 0 per rep; dal ved hver rep-grense.
fn lift(t_ms: f64, rep_ms: f64) -> f64 {
    0.5 * (1.0 - (2.0 * PI * t_ms / rep_ms).cos())
}

fn sample(t: f64, u: f64, rep_ms: f64) -> SensorSample {
    // Tilt 0–90° følger løftet
    let theta = u * PI / 2.0;
    SensorSample {
        timestamp_ms: t,
        accel_x: theta.sin(),
        accel_y: -theta.cos(),
        accel_z: 0.0,
        filtered_mag: Some(1.0 + u),
        gyro_x: Some(GYRO_AMP * (2.0 * PI * t / rep_ms).sin()),
        gyro_y: Some(0.0),
        gyro_z: Some(0.0),
        ..Default::default()
    }
}

/// `reps` like curl-reps à `rep_ms`, 50 Hz, siste sample på dalen.
pub fn curl_session_with(reps: usize, rep_ms: f64) -> Vec<SensorSample> {
    let n = (reps as f64 * rep_ms / DT_MS).round() as usize + 1;
    (0..n)
        .map(|i| {
            let t = i as f64 * DT_MS;
            sample(t, lift(t, rep_ms), rep_ms)
        })
        .collect()
}

pub fn curl_session(reps: usize) -> Vec<SensorSample> {
    curl_session_with(reps, REP_MS)
}

/// Monotont stigende signal uten ekstremer. Med `hints` merkes 100 samples per rep.
pub fn ramp_session(n: usize, hints: bool) -> Vec<SensorSample> {
    (0..n)
        .map(|i| SensorSample {
            timestamp_ms: i as f64 * DT_MS,
            accel_x: 0.0,
            accel_y: -1.0,
            accel_z: 0.0,
            filtered_mag: Some(1.0 + i as f64 * 0.001),
            rep_hint: if hints { Some((i / 100 + 1) as u32) } else { None },
            ..Default::default()
        })
        .collect()
}
