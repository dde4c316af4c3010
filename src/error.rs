use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Definition Error in {manoeuvre}: {reason}")]
    Definition { manoeuvre: String, reason: String },

    #[error("Expression Error: {0}")]
    Expression(String),

    #[error("Element sequence mismatch in {manoeuvre}: expected {expected:?}, got {actual:?}")]
    Sequence {
        manoeuvre: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Degenerate geometry in element {element}: {reason}")]
    Degenerate { element: String, reason: String },

    #[error("Alignment Error: {0}")]
    Alignment(String),

    #[error("Cannot restore {stage} stage: {reason}")]
    Stage { stage: String, reason: String },
}

impl ScoreError {
    pub fn degenerate(element: &str, reason: impl Into<String>) -> Self {
        ScoreError::Degenerate {
            element: element.to_string(),
            reason: reason.into(),
        }
    }

    pub fn definition(manoeuvre: &str, reason: impl Into<String>) -> Self {
        ScoreError::Definition {
            manoeuvre: manoeuvre.to_string(),
            reason: reason.into(),
        }
    }
}

pub type FsResult<T> = Result<T, ScoreError>;

/// Rejects NaN and infinities produced by an element computation.
pub fn finite(element: &str, what: &str, value: f64) -> FsResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScoreError::degenerate(
            element,
            format!("{} is not finite ({})", what, value),
        ))
    }
}

/// Guarded division: fails with a typed error instead of returning inf/NaN.
pub fn checked_div(element: &str, what: &str, num: f64, den: f64) -> FsResult<f64> {
    if den.abs() < 1e-9 {
        return Err(ScoreError::degenerate(
            element,
            format!("{} divides by zero", what),
        ));
    }
    finite(element, what, num / den)
}
