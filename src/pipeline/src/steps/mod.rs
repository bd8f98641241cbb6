//! Built-in pipeline steps
//!
//! These are the stages an endpoint assembles: authorization, query
//! assignment, payload parsing and schema validation.

mod assign_query;
mod authorization;
mod parse_payload;
mod validation;

pub use assign_query::AssignQueryStep;
pub use authorization::AuthorizationStep;
pub use parse_payload::{ParsePayloadStep, JSON_MIME};
pub use validation::{Target, Validation};
