//! # Gatehouse Pipeline
//!
//! Railway-oriented request processing on top of `gatehouse-authz`.
//!
//! An [`Outcome`] travels through a [`Pipeline`] of [`Step`]s. Each step
//! returns a new outcome on either the success or the halt track; halted
//! outcomes skip ordinary steps and only reach those added with
//! [`PipelineBuilder::step_always`]. [`Endpoint`]s assemble the standard
//! authorization, input validation, action and serialization stages.
//!
//! ## Example
//!
//! ```rust
//! use gatehouse_core::Request;
//! use gatehouse_pipeline::schema::{Field, Schema};
//! use gatehouse_pipeline::{Endpoint, Outcome};
//! use http::StatusCode;
//!
//! let endpoint = Endpoint::builder("products")
//!     .path("/products")
//!     .action_pipeline(|p| {
//!         p.query_schema(Schema::new().field(Field::integer("page").present()))
//!             .step(|o: Outcome| o.proceed())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let response = endpoint.handle(Request::get("/products").unwrap());
//! assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
//!
//! let response = endpoint.handle(Request::get("/products?page=2").unwrap());
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

pub mod endpoint;
pub mod error;
pub mod instrument;
pub mod outcome;
pub mod pipeline;
pub mod schema;
pub mod serializer;
pub mod steps;

// Re-export commonly used types
pub use endpoint::{respond_with, Endpoint, EndpointBuilder};
pub use error::{PipelineError, Result};
pub use instrument::{
    Attributes, Instrumenter, NullInstrumenter, RecordingInstrumenter, TracingInstrumenter,
};
pub use outcome::{Errors, Outcome, State};
pub use pipeline::{Bind, BindAny, Instrumented, Noop, Pipeline, PipelineBuilder, Step};
pub use schema::{Field, FieldType, Resolution, Resolve, Schema};
pub use serializer::{SerializerSet, StatusMatch};
pub use steps::{AssignQueryStep, AuthorizationStep, ParsePayloadStep, Validation};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
