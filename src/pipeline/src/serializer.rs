//! Status-driven response serialization
//!
//! A [`SerializerSet`] picks a serializer by the outcome's response status,
//! renders it to JSON and writes the body and `content-type` header.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde_json::{json, Value};
use tracing::warn;

use crate::outcome::Outcome;
use crate::pipeline::Step;
use crate::steps::JSON_MIME;

/// Renders an outcome to a JSON document; `Value::Null` means no body
pub type Serializer = Arc<dyn Fn(&Outcome) -> Value + Send + Sync>;

/// Statuses a serializer is registered for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMatch {
    Exact(u16),
    Range(RangeInclusive<u16>),
}

impl StatusMatch {
    pub fn matches(&self, status: StatusCode) -> bool {
        match self {
            StatusMatch::Exact(code) => status.as_u16() == *code,
            StatusMatch::Range(range) => range.contains(&status.as_u16()),
        }
    }
}

#[derive(Clone)]
struct Record {
    status: StatusMatch,
    serializer: Serializer,
}

/// Serializers keyed by response status
///
/// The most recently registered match wins, so serializers added on top of
/// [`SerializerSet::default`] override the defaults. Statuses without any
/// match use [`success`].
///
/// # Examples
///
/// ```
/// use gatehouse_pipeline::{Outcome, SerializerSet, Step};
/// use http::StatusCode;
/// use serde_json::json;
///
/// let serializers = SerializerSet::default()
///     .on(StatusCode::OK, |o: &Outcome| json!({"name": o.query.get("name")}));
///
/// let outcome = serializers.call(Outcome::default());
/// assert_eq!(outcome.response.json().unwrap(), json!({"name": null}));
/// ```
#[derive(Clone)]
pub struct SerializerSet {
    records: Vec<Record>,
}

impl SerializerSet {
    /// Set with no registered serializers
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Registers a serializer for one status
    pub fn on<F>(self, status: StatusCode, serializer: F) -> Self
    where
        F: Fn(&Outcome) -> Value + Send + Sync + 'static,
    {
        self.register(StatusMatch::Exact(status.as_u16()), serializer)
    }

    /// Registers a serializer for an inclusive range of statuses
    pub fn on_range<F>(self, range: RangeInclusive<u16>, serializer: F) -> Self
    where
        F: Fn(&Outcome) -> Value + Send + Sync + 'static,
    {
        self.register(StatusMatch::Range(range), serializer)
    }

    fn register<F>(mut self, status: StatusMatch, serializer: F) -> Self
    where
        F: Fn(&Outcome) -> Value + Send + Sync + 'static,
    {
        self.records.push(Record {
            status,
            serializer: Arc::new(serializer),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serializer registered for `status`
    pub fn serializer_for(&self, status: StatusCode) -> Serializer {
        self.records
            .iter()
            .rev()
            .find(|record| record.status.matches(status))
            .map(|record| Arc::clone(&record.serializer))
            .unwrap_or_else(|| Arc::new(success) as Serializer)
    }

    /// Renders the outcome into its response, keeping the current track
    pub fn run(&self, outcome: Outcome) -> Outcome {
        let serializer = self.serializer_for(outcome.status());
        let document = serializer(&outcome);
        if document.is_null() {
            return outcome;
        }

        let body = match serde_json::to_vec(&document) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "failed to serialize response");
                return outcome.copy_with(|o| {
                    o.response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                });
            }
        };

        outcome.copy_with(|o| {
            o.response.set_header(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
            o.response.set_body(body);
        })
    }
}

impl Default for SerializerSet {
    fn default() -> Self {
        Self::empty()
            .on_range(200..=299, success)
            .on(StatusCode::NO_CONTENT, no_content)
            .on(StatusCode::UNAUTHORIZED, unauthorized)
            .on(StatusCode::FORBIDDEN, forbidden)
            .on(StatusCode::NOT_FOUND, not_found)
            .on(StatusCode::UNPROCESSABLE_ENTITY, invalid)
            .on(StatusCode::INTERNAL_SERVER_ERROR, server_error)
    }
}

impl Step for SerializerSet {
    fn call(&self, outcome: Outcome) -> Outcome {
        self.run(outcome)
    }
}

impl fmt::Debug for SerializerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.records.iter().map(|record| &record.status))
            .finish()
    }
}

fn error_document(kind: &str, message: &str, errors: Value) -> Value {
    json!({
        "type": ["errors", kind],
        "message": message,
        "errors": errors,
    })
}

fn field_errors(field: &str, message: &str) -> Value {
    json!([{ "field": field, "messages": [message] }])
}

/// The action's object, or an empty success document
pub fn success(outcome: &Outcome) -> Value {
    json!({
        "type": ["success"],
        "data": outcome.object.clone().unwrap_or_else(|| json!({})),
    })
}

pub fn no_content(_outcome: &Outcome) -> Value {
    Value::Null
}

pub fn unauthorized(_outcome: &Outcome) -> Value {
    error_document(
        "unauthorized",
        "Unauthorized",
        field_errors("access_token", "Access denied. Missing or invalid access token."),
    )
}

pub fn forbidden(_outcome: &Outcome) -> Value {
    error_document(
        "forbidden",
        "Forbidden",
        field_errors(
            "access_token",
            "Access denied. Access token is valid but has insufficient permissions.",
        ),
    )
}

pub fn not_found(_outcome: &Outcome) -> Value {
    error_document("notFound", "Not found", field_errors("$", "Not found"))
}

/// Validation errors, one entry per field path
pub fn invalid(outcome: &Outcome) -> Value {
    let errors: Vec<Value> = outcome
        .errors
        .iter()
        .map(|(field, messages)| json!({ "field": field, "messages": messages }))
        .collect();
    error_document("invalid", "Invalid input", Value::Array(errors))
}

/// Uses the `error` context entry as the message when present
pub fn server_error(outcome: &Outcome) -> Value {
    let message = outcome
        .context
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("Internal server error");
    error_document("serverError", message, field_errors("$", message))
}
