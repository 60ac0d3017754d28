use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("Invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[error("Missing prerequisite data: {context}")]
    MissingPrerequisiteData { context: String },

    #[error("Invalid spectrum: {0}")]
    InvalidSpectrum(String),

    #[error("Invalid mobility trace: {0}")]
    InvalidTrace(String),

    #[error("Processing was cancelled")]
    Cancelled,
}

impl DetectionError {
    pub(crate) fn invalid_parameter(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_data(context: impl Into<String>) -> Self {
        Self::MissingPrerequisiteData {
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectionError>;
