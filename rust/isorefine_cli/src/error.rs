use isorefine::RefinementError;
use mzdetect::DetectionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Refinement error: {0}")]
    Refinement(#[from] RefinementError),

    #[error("Data processing error: {0}")]
    DataProcessing(String),
}
