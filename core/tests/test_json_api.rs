mod common;

use common::curl_session;
use liftgraph_core::{
    analyze_session_json, compute_fatigue_json, exercise_catalog_json, segment_session_json,
    AnalysisError, SensorSample,
};
use serde_json::{json, Value};

fn request(samples: &[SensorSample], extra: Value) -> String {
    let mut req = json!({ "samples": samples });
    if let (Some(obj), Value::Object(more)) = (req.as_object_mut(), extra) {
        obj.extend(more);
    }
    serde_json::to_string(&req).unwrap()
}

#[test]
fn analyze_json_roundtrip() {
    let samples = curl_session(6);
    let out = analyze_session_json(&request(
        &samples,
        json!({
            "source_name": "CONCENTRATION_CURLS_2024-05-01.csv",
            "session_id": "s1",
            "start_time_utc": "2024-05-01T10:00:00Z"
        }),
    ))
    .unwrap();

    let v: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["meta"]["session_id"], "s1");
    assert_eq!(v["meta"]["exercise"], "CONCENTRATION_CURLS");
    assert_eq!(v["segmentation"]["status"], "ok");
    assert_eq!(v["segmentation"]["value"]["strategy"]["kind"], "normal");
    assert_eq!(v["reps"].as_array().unwrap().len(), 6);
    assert_eq!(v["fatigue"]["status"], "ok");
    assert!(v["fatigue"]["value"]["D_omega"].is_number());
    assert_eq!(v["summary"]["total_reps"], 6);
}

#[test]
fn app_column_names_are_accepted() {
    let req = json!({
        "exercise": "bench press",
        "samples": (0..20).map(|i| json!({
            "timestampMs": i as f64 * 20.0,
            "accelX": 0.0, "accelY": -1.0, "accelZ": 0.0,
            "filteredMag": 1.0,
            "gyroX": 0.1, "gyroY": 0.0, "gyroZ": 0.0,
            "rep": 1
        })).collect::<Vec<_>>()
    });
    let out = segment_session_json(&req.to_string()).unwrap();
    let v: Value = serde_json::from_str(&out).unwrap();
    assert!(v["status"].is_string());
    assert_eq!(v["value"]["channel"], "filteredMag");
}

#[test]
fn parse_error_reports_path() {
    let req = json!({ "samples": [ { "timestamp_ms": 0.0, "accel_x": "x", "accel_y": 0.0, "accel_z": 0.0 } ] });
    match analyze_session_json(&req.to_string()) {
        Err(AnalysisError::Json { path, .. }) => assert!(path.starts_with("samples[0]"), "path {}", path),
        other => panic!("expected Json error, got {:?}", other),
    }
}

#[test]
fn unknown_exercise_is_an_error() {
    let out = analyze_session_json(&request(&curl_session(3), json!({ "exercise": "deadlift" })));
    assert!(matches!(out, Err(AnalysisError::UnknownExercise(_))));
}

#[test]
fn fatigue_json_accepts_partial_reps() {
    let reps: Vec<Value> = (0..6)
        .map(|i| json!({ "duration_ms": 2000.0 + 100.0 * i as f64, "peak_value": 1.0, "rom_raw": 1.0 }))
        .collect();
    let out = compute_fatigue_json(&json!({ "reps": reps }).to_string()).unwrap();
    let v: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["status"], "ok");
    assert!(v["value"]["I_T"].as_f64().unwrap() > 0.0);
    assert_eq!(v["value"]["n_reps_analyzed"], 6);

    let out = compute_fatigue_json(r#"{ "reps": [] }"#).unwrap();
    let v: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["status"], "insufficient_data");
}

#[test]
fn catalog_lists_all_exercises() {
    let v: Value = serde_json::from_str(&exercise_catalog_json().unwrap()).unwrap();
    let entries = v.as_array().unwrap();
    assert_eq!(entries.len(), 7);
    let pulldown = entries
        .iter()
        .find(|e| e["exercise"] == "LATERAL_PULLDOWN")
        .unwrap();
    assert_eq!(pulldown["equipment"], "weight_stack");
    assert_eq!(pulldown["quality_labels"][1], "Pulling Too Fast");
    assert_eq!(pulldown["profile"]["smoothing_window"], 21);
}

#[test]
fn app_csv_columns_deserialize() {
    let data = "\
timestampMs,accelX,accelY,accelZ,accelMag,filteredX,filteredY,filteredZ,filteredMag,gyroX,gyroY,gyroZ,rep
0,0.1,-0.98,0.05,0.99,0.1,-0.97,0.05,0.98,0.01,0.02,0.03,1
20,0.2,-0.95,0.04,0.97,0.18,-0.95,0.04,0.97,0.05,0.02,0.01,1
40,0.3,-0.90,0.03,0.95,,,,,,,,0
";
    let mut rdr = csv::Reader::from_reader(data.as_bytes());
    let rows: Vec<SensorSample> = rdr.deserialize().collect::<Result<_, _>>().unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].timestamp_ms, 20.0);
    assert_eq!(rows[0].filtered_mag, Some(0.98));
    assert_eq!(rows[0].rep_hint, Some(1));
    assert_eq!(rows[2].filtered_mag, None);
    assert_eq!(rows[2].gyro_magnitude(), None);
    assert!((rows[1].gyro_magnitude().unwrap() - (0.05f64.powi(2) + 0.0004 + 0.0001).sqrt()).abs() < 1e-12);
}
