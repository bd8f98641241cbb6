//! Error types shared by the Gatehouse crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building or reading requests and responses
#[derive(Debug, Error)]
pub enum CoreError {
    /// The URI could not be parsed
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// A header name or value was rejected
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A body could not be decoded as JSON
    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl CoreError {
    /// Create an invalid header error
    pub fn invalid_header<S: Into<String>>(msg: S) -> Self {
        CoreError::InvalidHeader(msg.into())
    }

    /// Create an invalid URI error
    pub fn invalid_uri<S: Into<String>>(msg: S) -> Self {
        CoreError::InvalidUri(msg.into())
    }
}
