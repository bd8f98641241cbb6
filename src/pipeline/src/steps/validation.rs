use std::sync::Arc;

use gatehouse_core::JsonMap;
use http::StatusCode;
use tracing::debug;

use crate::outcome::Outcome;
use crate::pipeline::Step;
use crate::schema::{Resolve, Schema};

/// Input map a validation step reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Query,
    Payload,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Query => "query",
            Target::Payload => "payload",
        }
    }

    fn get<'a>(&self, outcome: &'a Outcome) -> &'a JsonMap {
        match self {
            Target::Query => &outcome.query,
            Target::Payload => &outcome.payload,
        }
    }

    fn get_mut<'a>(&self, outcome: &'a mut Outcome) -> &'a mut JsonMap {
        match self {
            Target::Query => &mut outcome.query,
            Target::Payload => &mut outcome.payload,
        }
    }
}

/// Resolves the query or payload against a schema
///
/// Invalid input halts with `422 Unprocessable Entity`, the field errors
/// appended to the outcome's errors. Either way the coerced and defaulted
/// output is merged over the original input.
#[derive(Clone)]
pub struct Validation {
    target: Target,
    resolver: Arc<dyn Resolve>,
    schema: Option<Schema>,
}

impl Validation {
    pub fn query(schema: Schema) -> Self {
        Self::for_schema(Target::Query, schema)
    }

    pub fn payload(schema: Schema) -> Self {
        Self::for_schema(Target::Payload, schema)
    }

    /// Validation with a custom resolver; it reports no schema
    pub fn custom(target: Target, resolver: impl Resolve + 'static) -> Self {
        Self {
            target,
            resolver: Arc::new(resolver),
            schema: None,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    fn for_schema(target: Target, schema: Schema) -> Self {
        Self {
            target,
            resolver: Arc::new(schema.clone()),
            schema: Some(schema),
        }
    }
}

impl Step for Validation {
    fn call(&self, outcome: Outcome) -> Outcome {
        let input = self.target.get(&outcome).clone();
        let resolution = self.resolver.resolve(&input);

        if !resolution.is_valid() {
            debug!(
                target_map = self.target.as_str(),
                fields = ?resolution.errors.keys().collect::<Vec<_>>(),
                "validation failed"
            );
            return outcome.halt_with(|o| {
                for (field, messages) in resolution.errors {
                    o.errors.entry(field).or_default().extend(messages);
                }
                let map = self.target.get_mut(o);
                *map = input;
                map.extend(resolution.output);
                o.response.set_status(StatusCode::UNPROCESSABLE_ENTITY);
            });
        }

        outcome.proceed_with(|o| {
            let map = self.target.get_mut(o);
            *map = input;
            map.extend(resolution.output);
        })
    }

    fn query_schema(&self) -> Option<Schema> {
        match self.target {
            Target::Query => self.schema.clone(),
            Target::Payload => None,
        }
    }

    fn payload_schema(&self) -> Option<Schema> {
        match self.target {
            Target::Payload => self.schema.clone(),
            Target::Query => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Resolution};
    use serde_json::{json, Value};

    fn map(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    fn id_schema() -> Schema {
        Schema::new().field(Field::integer("id").present())
    }

    #[test]
    fn test_query_validation() {
        let step = Validation::query(id_schema());

        let halted = step.call(Outcome::default());
        assert!(halted.is_halted());
        assert_eq!(halted.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(halted.errors["$.id"], vec!["is required"]);

        let valid = step.call(Outcome::default().proceed_with(|o| o.query = map(json!({"id": 12}))));
        assert!(!valid.is_halted());
        assert_eq!(valid.status(), StatusCode::OK);
        assert!(valid.is_valid());
    }

    #[test]
    fn test_payload_validation() {
        let step = Validation::payload(id_schema());

        let halted = step.call(Outcome::default());
        assert_eq!(halted.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(halted.errors["$.id"], vec!["is required"]);

        let valid =
            step.call(Outcome::default().proceed_with(|o| o.payload = map(json!({"id": "12"}))));
        assert_eq!(valid.payload["id"], json!(12));
    }

    #[test]
    fn test_output_is_merged_over_input() {
        let step = Validation::query(Schema::new().field(Field::string("sort").default("name")));
        let outcome =
            step.call(Outcome::default().proceed_with(|o| o.query = map(json!({"page": "2"}))));

        assert_eq!(outcome.query, map(json!({"page": "2", "sort": "name"})));
    }

    #[test]
    fn test_existing_errors_are_kept() {
        let step = Validation::query(id_schema());
        let outcome = step.call(Outcome::default().proceed_with(|o| {
            o.errors.insert("$.other".to_string(), vec!["bad".to_string()]);
            o.query = map(json!({"id": "x"}));
        }));

        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors["$.id"], vec!["must be an integer"]);
        assert_eq!(outcome.query["id"], json!("x"));
    }

    #[test]
    fn test_halt_keeps_resolved_values() {
        let step = Validation::query(
            Schema::new()
                .field(Field::integer("id").present())
                .field(Field::string("sort").default("name"))
                .field(Field::integer("page")),
        );
        let outcome =
            step.call(Outcome::default().proceed_with(|o| o.query = map(json!({"page": "3"}))));

        assert!(outcome.is_halted());
        assert_eq!(outcome.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(outcome.errors["$.id"], vec!["is required"]);
        assert_eq!(outcome.query, map(json!({"page": 3, "sort": "name"})));
    }

    #[test]
    fn test_errors_are_appended_per_field() {
        let step = Validation::query(id_schema());
        let outcome = step.call(Outcome::default().proceed_with(|o| {
            o.errors.insert("$.id".to_string(), vec!["is taken".to_string()]);
        }));

        assert_eq!(outcome.errors["$.id"], vec!["is taken", "is required"]);
    }

    struct RejectAll;

    impl Resolve for RejectAll {
        fn resolve(&self, _input: &JsonMap) -> Resolution {
            let mut resolution = Resolution::default();
            resolution.errors.insert("$".to_string(), vec!["rejected".to_string()]);
            resolution
        }
    }

    #[test]
    fn test_custom_resolver() {
        let step = Validation::custom(Target::Payload, RejectAll);
        assert!(step.call(Outcome::default()).is_halted());
        assert!(step.payload_schema().is_none());
        assert_eq!(step.target(), Target::Payload);
    }

    #[test]
    fn test_reports_schema_for_its_target() {
        let step = Validation::query(id_schema());
        assert_eq!(step.query_schema(), Some(id_schema()));
        assert!(step.payload_schema().is_none());
    }
}
