//! Error types for pipeline and endpoint construction
//!
//! Runtime validation and authorization failures never surface here: they
//! travel inside a halted [`Outcome`](crate::Outcome) with a status set.

use gatehouse_authz::{AuthError, ScopeError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Endpoint declaration was rejected at build time
    #[error("Invalid endpoint {name}: {reason}")]
    InvalidEndpoint { name: String, reason: String },
}

impl PipelineError {
    pub fn invalid_endpoint<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        PipelineError::InvalidEndpoint {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
