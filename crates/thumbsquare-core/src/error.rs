//! Errors surfaced to callers of the square image service.

use thiserror::Error;

use crate::decode::DecodeError;
use crate::encode::EncodeError;

/// Failure of a square image request.
///
/// Cache misses and evictions are not errors and never appear here.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was rejected before any work was done.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The source image could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The result could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The worker running the request went away before finishing.
    #[error("Request was cancelled before completion")]
    Cancelled,
}

impl ServiceError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ServiceError::InvalidRequest(msg.into())
    }

    /// Check if this error was raised by request validation.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, ServiceError::InvalidRequest(_))
    }
}
