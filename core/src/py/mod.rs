use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::AnalysisError;

fn to_py_err(e: AnalysisError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// str sendes rett gjennom, alt annet serialiseres med Python sin json.dumps.
fn payload_to_json(py: Python<'_>, payload: &PyAny) -> PyResult<String> {
    if let Ok(s) = payload.extract::<&str>() {
        return Ok(s.to_owned());
    }
    let json_mod = py
        .import("json")
        .map_err(|e| PyValueError::new_err(format!("failed to import json: {e}")))?;
    json_mod
        .call_method1("dumps", (payload,))
        .and_then(|o| o.extract::<String>())
        .map_err(|e| PyValueError::new_err(format!("failed to serialize payload with json.dumps: {e}")))
}

/// JSON-streng tilbake som dict via json.loads (ingen pyo3 serde-feature).
fn json_to_object(py: Python<'_>, out: &str) -> PyResult<PyObject> {
    let json_mod = py
        .import("json")
        .map_err(|e| PyValueError::new_err(format!("failed to import json: {e}")))?;
    let obj = json_mod
        .call_method1("loads", (out,))
        .map_err(|e| PyValueError::new_err(format!("internal JSON parse error via json.loads: {e}")))?;
    Ok(obj.into_py(py))
}

// ──────────────────────────────────────────────────────────────────────────────
// STRENG INN / STRENG UT
// ──────────────────────────────────────────────────────────────────────────────

#[pyfunction]
fn analyze_session_json(json_in: &str) -> PyResult<String> {
    crate::analyze_session_json(json_in).map_err(to_py_err)
}

#[pyfunction]
fn segment_session_json(json_in: &str) -> PyResult<String> {
    crate::segment_session_json(json_in).map_err(to_py_err)
}

#[pyfunction]
fn compute_fatigue_json(json_in: &str) -> PyResult<String> {
    crate::compute_fatigue_json(json_in).map_err(to_py_err)
}

#[pyfunction]
fn exercise_catalog_json() -> PyResult<String> {
    crate::exercise_catalog_json().map_err(to_py_err)
}

#[pyfunction]
fn model_feature_names() -> Vec<String> {
    crate::features::model_feature_names()
}

// ──────────────────────────────────────────────────────────────────────────────
// DICT INN / DICT UT
// ──────────────────────────────────────────────────────────────────────────────

#[pyfunction]
fn analyze_session(py: Python<'_>, payload: &PyAny) -> PyResult<PyObject> {
    let json_in = payload_to_json(py, payload)?;
    let out = crate::analyze_session_json(&json_in).map_err(to_py_err)?;
    json_to_object(py, &out)
}

#[pyfunction]
fn compute_fatigue(py: Python<'_>, payload: &PyAny) -> PyResult<PyObject> {
    let json_in = payload_to_json(py, payload)?;
    let out = crate::compute_fatigue_json(&json_in).map_err(to_py_err)?;
    json_to_object(py, &out)
}

#[pymodule]
fn liftgraph_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(analyze_session, m)?)?;
    m.add_function(wrap_pyfunction!(compute_fatigue, m)?)?;

    m.add_function(wrap_pyfunction!(analyze_session_json, m)?)?;
    m.add_function(wrap_pyfunction!(segment_session_json, m)?)?;
    m.add_function(wrap_pyfunction!(compute_fatigue_json, m)?)?;
    m.add_function(wrap_pyfunction!(exercise_catalog_json, m)?)?;
    m.add_function(wrap_pyfunction!(model_feature_names, m)?)?;
    Ok(())
}
