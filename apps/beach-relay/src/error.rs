use thiserror::Error;

use crate::store::StoreError;

/// Every way a signaling request can fail. Absent offers, answers and candidates are not
/// errors; they come back as `null` or empty results.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or malformed parameter. Always raised before any store write.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Server error")]
    Store(#[from] StoreError),
}

impl RelayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RelayError::InvalidRequest(message.into())
    }

    /// Stable label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::InvalidRequest(_) => "invalid_request",
            RelayError::NotFound => "not_found",
            RelayError::MethodNotAllowed => "method_not_allowed",
            RelayError::Store(_) => "server_error",
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
