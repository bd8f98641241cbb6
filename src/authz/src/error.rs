//! Error types for authentication and authorization

use http::StatusCode;
use thiserror::Error;

use crate::scope::ScopeError;

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential could be extracted from the request
    #[error("Missing access token: {0}")]
    MissingAccessToken(String),

    /// The credential is unknown, malformed or badly signed
    #[error("Invalid access token: {0}")]
    InvalidAccessToken(String),

    /// The credential was valid once but has expired
    #[error("Expired access token: {0}")]
    ExpiredAccessToken(String),

    /// None of the granted scopes covers the required one
    #[error("requires scope: {required}, but provided {provided}")]
    InsufficientScopes { required: String, provided: String },

    /// Scopes were sufficient but an authorizer check refused access
    #[error("Forbidden: {0}")]
    ForbiddenAccess(String),

    /// Token issuance needs a signing key that was not configured
    #[error("No private key configured for issuing tokens")]
    MissingPrivateKey,

    /// A signing or verification key could not be loaded
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Scope parsing error
    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),

    /// Settings could not be turned into a configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAccessToken(_)
            | AuthError::InvalidAccessToken(_)
            | AuthError::ExpiredAccessToken(_)
            | AuthError::Scope(_) => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientScopes { .. } | AuthError::ForbiddenAccess(_) => {
                StatusCode::FORBIDDEN
            }
            AuthError::MissingPrivateKey | AuthError::InvalidKey(_) | AuthError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAccessToken(_) => "MISSING_ACCESS_TOKEN",
            AuthError::InvalidAccessToken(_) => "INVALID_ACCESS_TOKEN",
            AuthError::ExpiredAccessToken(_) => "EXPIRED_ACCESS_TOKEN",
            AuthError::InsufficientScopes { .. } => "INSUFFICIENT_SCOPES",
            AuthError::ForbiddenAccess(_) => "FORBIDDEN",
            AuthError::MissingPrivateKey => "MISSING_PRIVATE_KEY",
            AuthError::InvalidKey(_) => "INVALID_KEY",
            AuthError::Scope(_) => "INVALID_SCOPE",
            AuthError::Config(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type for authentication and authorization operations
pub type Result<T> = std::result::Result<T, AuthError>;
