use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Feil som kan oppstå i kantene av biblioteket (JSON-inngang, profiler, disk).
/// Selve analysen returnerer aldri `Err` – se [`Outcome`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("parse error at {path}: {message}")]
    Json { path: String, message: String },

    #[error("unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("invalid profile for {exercise}: {reason}")]
    InvalidProfile { exercise: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub(crate) fn from_path_error(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
        AnalysisError::Json {
            path: e.path().to_string(),
            message: e.inner().to_string(),
        }
    }
}

/// Status-tag for et resultat, uten selve verdien.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    InsufficientData,
    DegenerateSignal,
    SegmentationFailure,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::InsufficientData => "insufficient_data",
            Status::DegenerateSignal => "degenerate_signal",
            Status::SegmentationFailure => "segmentation_failure",
        }
    }
}

/// Resultat av et analysesteg. Alle varianter bærer en komplett, gyldig verdi,
/// slik at kallere alltid får et typet objekt tilbake – statusen forteller
/// hvor mye man kan stole på den.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok(T),
    InsufficientData(T),
    DegenerateSignal(T),
    SegmentationFailure(T),
}

impl<T> Outcome<T> {
    pub fn status(&self) -> Status {
        match self {
            Outcome::Ok(_) => Status::Ok,
            Outcome::InsufficientData(_) => Status::InsufficientData,
            Outcome::DegenerateSignal(_) => Status::DegenerateSignal,
            Outcome::SegmentationFailure(_) => Status::SegmentationFailure,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Ok(v)
            | Outcome::InsufficientData(v)
            | Outcome::DegenerateSignal(v)
            | Outcome::SegmentationFailure(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Ok(v)
            | Outcome::InsufficientData(v)
            | Outcome::DegenerateSignal(v)
            | Outcome::SegmentationFailure(v) => v,
        }
    }

    pub fn with_status(status: Status, value: T) -> Self {
        match status {
            Status::Ok => Outcome::Ok(value),
            Status::InsufficientData => Outcome::InsufficientData(value),
            Status::DegenerateSignal => Outcome::DegenerateSignal(value),
            Status::SegmentationFailure => Outcome::SegmentationFailure(value),
        }
    }
}
