use serde::Serialize;

/// Error type for the engine's fallible surfaces.
///
/// The pure calculation core never fails on well-formed numeric input
/// (divide-by-zero paths fall back to sentinel values instead of erroring);
/// these variants cover configuration, caller-contract, and data-source
/// problems in the layers around it.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ForecastError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ForecastError {
    fn from(err: validator::ValidationErrors) -> Self {
        ForecastError::ValidationError(err.to_string())
    }
}
