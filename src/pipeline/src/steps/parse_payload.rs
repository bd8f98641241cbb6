use http::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::outcome::Outcome;
use crate::pipeline::Step;
use crate::schema::ROOT_PATH;

pub const JSON_MIME: &str = "application/json";

/// Parses the request body into the outcome's payload map
///
/// Bodies are read as JSON whatever the declared content type. An empty body
/// yields an empty payload; anything that is not a JSON object halts with
/// `422 Unprocessable Entity` and an error under `$`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParsePayloadStep;

impl Step for ParsePayloadStep {
    fn call(&self, outcome: Outcome) -> Outcome {
        let body = outcome.request().body();
        if body.iter().all(u8::is_ascii_whitespace) {
            return outcome.proceed_with(|o| o.payload.clear());
        }

        if let Some(media_type) = outcome.request().media_type() {
            if media_type != JSON_MIME {
                debug!(media_type, "parsing non-JSON media type as JSON");
            }
        }

        let message = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(payload)) => return outcome.proceed_with(|o| o.payload = payload),
            Ok(_) => "must be a JSON object".to_string(),
            Err(err) => format!("is not valid JSON: {}", err),
        };

        debug!(error = %message, "halting: unreadable payload");
        outcome.halt_with(|o| {
            o.errors.entry(ROOT_PATH.to_string()).or_default().push(message);
            o.response.set_status(StatusCode::UNPROCESSABLE_ENTITY);
        })
    }
}
