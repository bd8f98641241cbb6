//! # Gatehouse Core
//!
//! Shared HTTP-facing types for the Gatehouse crates.
//! This package sits below both `gatehouse-authz` (authenticators read requests)
//! and `gatehouse-pipeline` (steps mutate responses) so neither depends on the other
//! for transport types.

pub mod error;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use request::Request;
pub use response::Response;

/// JSON object used for query, payload, context and claims maps.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
