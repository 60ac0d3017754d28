use mzdetect::DetectionError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Unknown element `{symbol}` in `{input}`")]
    UnknownElement { symbol: String, input: String },

    #[error("Could not parse `{input}` at position {position}: {reason}")]
    Syntax {
        input: String,
        position: usize,
        reason: &'static str,
    },

    #[error("Ionizing `{formula}` with {ion_type} leaves a negative count of {element}")]
    NegativeCount {
        formula: String,
        ion_type: String,
        element: &'static str,
    },

    #[error("Element counts or charge of `{0}` do not fit in 32 bits")]
    CountOverflow(String),

    #[error("Empty formula")]
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Cannot predict an m/z pattern for the uncharged formula {0}")]
    Uncharged(String),

    #[error("Cannot predict a pattern for {0}, it contains negative element counts")]
    NegativeCount(String),

    #[error("Minimum intensity must be within [0, 100], got {0}")]
    InvalidMinIntensity(f64),

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("Empty formula")]
    EmptyFormula,
}

/// Why an annotation got a zero isotope score instead of a real one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnscorableReason {
    #[error("annotation has no molecular formula")]
    MissingFormula,

    #[error("annotation has no ion type")]
    MissingIonType,

    #[error("no measured isotope signals for charge {0}")]
    MissingMeasuredPattern(u32),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefinementError {
    #[error("Row {row_id}: missing prerequisite data, {context}")]
    MissingPrerequisiteData { row_id: u64, context: String },

    #[error("Refinement was cancelled")]
    Cancelled,

    #[error(transparent)]
    InvalidConfig(#[from] DetectionError),
}

pub type Result<T> = std::result::Result<T, RefinementError>;
