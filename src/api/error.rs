//! API Error Types

use thiserror::Error;

/// Errors that stop the HTTP server
#[derive(Error, Debug)]
pub enum ApiError {
    /// Binding or accepting failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
