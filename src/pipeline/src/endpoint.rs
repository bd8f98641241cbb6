//! Named endpoints and their canonical pipeline
//!
//! An [`Endpoint`] ties an action to a verb, a path and an optional required
//! scope. Building it assembles the pipeline every request goes through:
//!
//! ```text
//! gatehouse.endpoint
//! ├── authorization           (when a scope is required)
//! ├── assign query
//! ├── gatehouse.endpoint.parse_payload     (POST, PUT, PATCH)
//! ├── gatehouse.endpoint.validate_inputs   (action's query and payload schemas)
//! ├── gatehouse.endpoint.action
//! └── gatehouse.endpoint.serializer        (runs for halted outcomes too)
//! ```

use std::fmt;
use std::sync::Arc;

use gatehouse_authz::scope::ScopeResult;
use gatehouse_authz::{Auth, AuthConfig, AuthSettings, IntoScope, Scope};
use gatehouse_core::{Request, Response};
use http::Method;
use serde_json::Value;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::instrument::{Attributes, Instrumenter, NullInstrumenter};
use crate::outcome::Outcome;
use crate::pipeline::{Instrumented, Noop, Pipeline, PipelineBuilder, Step};
use crate::schema::Schema;
use crate::serializer::SerializerSet;
use crate::steps::{AssignQueryStep, AuthorizationStep, ParsePayloadStep};

/// Shared action handed to the instrumented action stage
struct Action(Arc<dyn Step>);

impl Step for Action {
    fn call(&self, outcome: Outcome) -> Outcome {
        self.0.call(outcome)
    }

    fn query_schema(&self) -> Option<Schema> {
        self.0.query_schema()
    }

    fn payload_schema(&self) -> Option<Schema> {
        self.0.payload_schema()
    }
}

/// A routable unit: request in, response out
#[derive(Clone)]
pub struct Endpoint {
    name: String,
    path: String,
    title: Option<String>,
    verb: Method,
    scope: Option<Scope>,
    action: Arc<dyn Step>,
    pipeline: Pipeline,
}

impl Endpoint {
    pub fn builder(name: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn verb(&self) -> &Method {
        &self.verb
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Whether requests must carry a credential
    pub fn authenticates(&self) -> bool {
        self.scope.is_some()
    }

    /// Whether `auth` may call this endpoint
    pub fn is_authorized(&self, auth: &Auth) -> bool {
        auth.is_authorized(self.scope.as_ref())
    }

    pub fn query_schema(&self) -> Option<Schema> {
        self.action.query_schema()
    }

    pub fn payload_schema(&self) -> Option<Schema> {
        self.action.payload_schema()
    }

    /// Runs the full pipeline for `request` and returns the final outcome
    pub fn process(&self, request: Request) -> Outcome {
        self.pipeline.call(Outcome::new(request))
    }

    /// Runs the full pipeline for `request` and returns its response
    pub fn handle(&self, request: Request) -> Response {
        self.process(request).response
    }
}

impl Step for Endpoint {
    fn call(&self, outcome: Outcome) -> Outcome {
        self.pipeline.call(outcome)
    }

    fn query_schema(&self) -> Option<Schema> {
        self.action.query_schema()
    }

    fn payload_schema(&self) -> Option<Schema> {
        self.action.payload_schema()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.scope.as_ref().map(ToString::to_string).unwrap_or_default();
        write!(
            f,
            "Endpoint {{ name: {}, path: {} {} ({}) }}",
            self.name, self.verb, self.path, scope
        )
    }
}

/// Builder for [`Endpoint`]
pub struct EndpointBuilder {
    name: String,
    path: String,
    title: Option<String>,
    verb: Method,
    scope: Option<ScopeResult<Scope>>,
    auth: Arc<AuthConfig>,
    action: Arc<dyn Step>,
    serializers: SerializerSet,
    instrumenter: Arc<dyn Instrumenter>,
}

impl EndpointBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            title: None,
            verb: Method::GET,
            scope: None,
            auth: Arc::new(AuthConfig::default()),
            action: Arc::new(Noop),
            serializers: SerializerSet::default(),
            instrumenter: Arc::new(NullInstrumenter),
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn verb(mut self, verb: Method) -> Self {
        self.verb = verb;
        self
    }

    /// Scope required to call the endpoint; invalid scopes fail at `build`
    pub fn scope(mut self, scope: impl IntoScope) -> Self {
        self.scope = Some(scope.into_scope());
        self
    }

    pub fn auth(mut self, config: Arc<AuthConfig>) -> Self {
        self.auth = config;
        self
    }

    /// Authentication built from settings
    pub fn auth_settings(self, settings: &AuthSettings) -> Result<Self> {
        let config = AuthConfig::from_settings(settings)?;
        Ok(self.auth(Arc::new(config)))
    }

    pub fn action(mut self, action: impl Step + 'static) -> Self {
        self.action = Arc::new(action);
        self
    }

    /// Action declared as a pipeline using the endpoint's instrumenter
    pub fn action_pipeline<F>(self, f: F) -> Self
    where
        F: FnOnce(PipelineBuilder) -> PipelineBuilder,
    {
        let builder = Pipeline::builder().with_instrumenter(Arc::clone(&self.instrumenter));
        let action = f(builder).build();
        self.action(action)
    }

    pub fn serializers(mut self, serializers: SerializerSet) -> Self {
        self.serializers = serializers;
        self
    }

    /// Adds to the current serializers
    pub fn serializer<F>(mut self, f: F) -> Self
    where
        F: FnOnce(SerializerSet) -> SerializerSet,
    {
        self.serializers = f(self.serializers);
        self
    }

    pub fn instrumenter(mut self, instrumenter: Arc<dyn Instrumenter>) -> Self {
        self.instrumenter = instrumenter;
        self
    }

    pub fn build(self) -> Result<Endpoint> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::invalid_endpoint(self.name, "name must not be blank"));
        }
        if !self.path.starts_with('/') {
            return Err(PipelineError::invalid_endpoint(self.name, "path must start with '/'"));
        }

        let scope = self.scope.transpose()?;
        let authorization = scope
            .as_ref()
            .map(|scope| AuthorizationStep::new(Arc::clone(&self.auth), scope))
            .transpose()?;

        let attrs = Attributes::new()
            .with("name", &self.name)
            .with("path", &self.path)
            .with("verb", &self.verb)
            .with("scope", scope.as_ref().map(ToString::to_string).unwrap_or_default());

        let parses_payload = matches!(self.verb, Method::POST | Method::PUT | Method::PATCH);
        let query_schema = self.action.query_schema();
        let payload_schema = self.action.payload_schema();
        let action = Action(Arc::clone(&self.action));
        let action_attrs = Attributes::new().with("info", &self.name);
        let serializer = Instrumented::new(
            Arc::clone(&self.instrumenter),
            "gatehouse.endpoint.serializer",
            Attributes::new(),
            self.serializers,
        );

        let pipeline = Pipeline::builder()
            .with_instrumenter(Arc::clone(&self.instrumenter))
            .instrument("gatehouse.endpoint", attrs, move |mut p| {
                if let Some(authorization) = authorization {
                    p = p.step(authorization);
                }
                p = p.step(AssignQueryStep);
                if parses_payload {
                    p = p.instrument_step(
                        ParsePayloadStep,
                        "gatehouse.endpoint.parse_payload",
                        Attributes::new(),
                    );
                }
                p.instrument("gatehouse.endpoint.validate_inputs", Attributes::new(), |mut v| {
                    if let Some(schema) = query_schema {
                        v = v.query_schema(schema);
                    }
                    if let Some(schema) = payload_schema {
                        v = v.payload_schema(schema);
                    }
                    v
                })
                .instrument_step(action, "gatehouse.endpoint.action", action_attrs)
                .proceed()
                .step_always(serializer)
            })
            .build();

        info!(
            name = %self.name,
            verb = %self.verb,
            path = %self.path,
            scope = ?scope.as_ref().map(ToString::to_string),
            "endpoint ready"
        );

        Ok(Endpoint {
            name: self.name,
            path: self.path,
            title: self.title,
            verb: self.verb,
            scope,
            action: self.action,
            pipeline,
        })
    }
}

/// Sets the action's object from a JSON value, for simple actions
pub fn respond_with(outcome: Outcome, object: Value) -> Outcome {
    outcome.proceed_with(|o| o.object = Some(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::RecordingInstrumenter;
    use crate::schema::Field;
    use http::StatusCode;
    use serde_json::json;

    fn echo(outcome: Outcome) -> Outcome {
        let object = Value::Object(outcome.query.clone());
        respond_with(outcome, object)
    }

    #[test]
    fn test_defaults() {
        let endpoint = Endpoint::builder("root").build().unwrap();
        assert_eq!(endpoint.path(), "/");
        assert_eq!(endpoint.verb(), &Method::GET);
        assert!(!endpoint.authenticates());
        assert!(endpoint.query_schema().is_none());

        let response = endpoint.handle(Request::get("/").unwrap());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json().unwrap()["type"], json!(["success"]));
    }

    #[test]
    fn test_rejects_bad_declarations() {
        assert!(matches!(
            Endpoint::builder("x").path("products").build(),
            Err(PipelineError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            Endpoint::builder(" ").build(),
            Err(PipelineError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            Endpoint::builder("x").scope("a..b").build(),
            Err(PipelineError::Scope(_))
        ));
    }

    #[test]
    fn test_action_schemas_are_exposed() {
        let endpoint = Endpoint::builder("search")
            .action_pipeline(|p| {
                p.query_schema(Schema::new().field(Field::string("q").required()))
                    .step(echo)
            })
            .build()
            .unwrap();

        assert_eq!(endpoint.query_schema().unwrap().field_names(), vec!["q"]);
        assert!(endpoint.payload_schema().is_none());
    }

    #[test]
    fn test_stages_are_instrumented() {
        let recorder = Arc::new(RecordingInstrumenter::new());
        let endpoint = Endpoint::builder("create")
            .verb(Method::POST)
            .path("/things")
            .instrumenter(recorder.clone())
            .action(echo)
            .build()
            .unwrap();

        endpoint.handle(Request::parse(Method::POST, "/things").unwrap());

        assert_eq!(
            recorder.labels(),
            vec![
                "gatehouse.endpoint",
                "gatehouse.endpoint.parse_payload",
                "gatehouse.endpoint.validate_inputs",
                "gatehouse.endpoint.action",
                "gatehouse.endpoint.serializer",
            ]
        );
        let attrs = &recorder.events()[0].1;
        assert_eq!(attrs.get("name"), Some("create"));
        assert_eq!(attrs.get("verb"), Some("POST"));
        assert_eq!(attrs.get("path"), Some("/things"));
    }

    #[test]
    fn test_debug_format() {
        let endpoint = Endpoint::builder("products")
            .path("/products")
            .scope("api.products.read")
            .build()
            .unwrap();

        assert_eq!(
            format!("{:?}", endpoint),
            "Endpoint { name: products, path: GET /products (api.products.read) }"
        );
    }
}
