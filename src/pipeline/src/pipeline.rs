//! Railway-oriented step composition
//!
//! A [`Pipeline`] folds its steps into a chain of [`Bind`] and [`BindAny`]
//! nodes. `Bind` skips the right-hand step once the outcome is halted;
//! `BindAny` always runs it. Schemas reported by any step along the chain are
//! merged, so a pipeline can describe every input it validates.

use std::sync::Arc;

use tracing::debug;

use crate::instrument::{Attributes, Instrumenter, NullInstrumenter};
use crate::outcome::Outcome;
use crate::schema::{merge_optional, Schema};
use crate::steps::Validation;

/// A unit of work in a pipeline
pub trait Step: Send + Sync {
    fn call(&self, outcome: Outcome) -> Outcome;

    /// Query schema this step validates, if any
    fn query_schema(&self) -> Option<Schema> {
        None
    }

    /// Payload schema this step validates, if any
    fn payload_schema(&self) -> Option<Schema> {
        None
    }
}

impl<F> Step for F
where
    F: Fn(Outcome) -> Outcome + Send + Sync,
{
    fn call(&self, outcome: Outcome) -> Outcome {
        self(outcome)
    }
}

/// Passes the outcome through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Step for Noop {
    fn call(&self, outcome: Outcome) -> Outcome {
        outcome
    }
}

/// Runs `right` only if `left` did not halt
#[derive(Clone)]
pub struct Bind {
    left: Arc<dyn Step>,
    right: Arc<dyn Step>,
}

impl Bind {
    pub fn new(left: Arc<dyn Step>, right: Arc<dyn Step>) -> Self {
        Self { left, right }
    }
}

impl Step for Bind {
    fn call(&self, outcome: Outcome) -> Outcome {
        let outcome = self.left.call(outcome);
        if outcome.is_halted() {
            outcome
        } else {
            self.right.call(outcome)
        }
    }

    fn query_schema(&self) -> Option<Schema> {
        merge_optional(self.left.query_schema(), self.right.query_schema())
    }

    fn payload_schema(&self) -> Option<Schema> {
        merge_optional(self.left.payload_schema(), self.right.payload_schema())
    }
}

/// Runs `right` whatever `left` returned
#[derive(Clone)]
pub struct BindAny {
    left: Arc<dyn Step>,
    right: Arc<dyn Step>,
}

impl BindAny {
    pub fn new(left: Arc<dyn Step>, right: Arc<dyn Step>) -> Self {
        Self { left, right }
    }
}

impl Step for BindAny {
    fn call(&self, outcome: Outcome) -> Outcome {
        self.right.call(self.left.call(outcome))
    }

    fn query_schema(&self) -> Option<Schema> {
        merge_optional(self.left.query_schema(), self.right.query_schema())
    }

    fn payload_schema(&self) -> Option<Schema> {
        merge_optional(self.left.payload_schema(), self.right.payload_schema())
    }
}

/// A step wrapped in a named span of the configured [`Instrumenter`]
#[derive(Clone)]
pub struct Instrumented {
    label: String,
    attrs: Attributes,
    inner: Arc<dyn Step>,
    instrumenter: Arc<dyn Instrumenter>,
}

impl Instrumented {
    pub fn new(
        instrumenter: Arc<dyn Instrumenter>,
        label: impl Into<String>,
        attrs: Attributes,
        inner: impl Step + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            attrs,
            inner: Arc::new(inner),
            instrumenter,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Step for Instrumented {
    fn call(&self, outcome: Outcome) -> Outcome {
        let inner = &self.inner;
        self.instrumenter
            .instrument(&self.label, &self.attrs, Box::new(move || inner.call(outcome)))
    }

    fn query_schema(&self) -> Option<Schema> {
        self.inner.query_schema()
    }

    fn payload_schema(&self) -> Option<Schema> {
        self.inner.payload_schema()
    }
}

/// Immutable, composed sequence of steps
///
/// # Examples
///
/// ```
/// use gatehouse_pipeline::{Outcome, Pipeline, Step};
/// use serde_json::json;
///
/// let pipeline = Pipeline::builder()
///     .step(|o: Outcome| o.proceed_with(|o| {
///         o.query.insert("name".to_string(), json!("John"));
///     }))
///     .halt()
///     .step(|o: Outcome| o.proceed_with(|o| {
///         o.query.insert("name".to_string(), json!("Joe"));
///     }))
///     .build();
///
/// let outcome = pipeline.call(Outcome::default());
/// assert!(outcome.is_halted());
/// assert_eq!(outcome.query["name"], json!("John"));
/// ```
#[derive(Clone)]
pub struct Pipeline {
    pipe: Arc<dyn Step>,
    instrumenter: Arc<dyn Instrumenter>,
    stages: usize,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Number of stages declared at this level
    pub fn stages(&self) -> usize {
        self.stages
    }

    pub fn instrumenter(&self) -> Arc<dyn Instrumenter> {
        Arc::clone(&self.instrumenter)
    }
}

impl Step for Pipeline {
    fn call(&self, outcome: Outcome) -> Outcome {
        self.pipe.call(outcome)
    }

    fn query_schema(&self) -> Option<Schema> {
        self.pipe.query_schema()
    }

    fn payload_schema(&self) -> Option<Schema> {
        self.pipe.payload_schema()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish()
    }
}

/// Builder for [`Pipeline`]
pub struct PipelineBuilder {
    pipe: Arc<dyn Step>,
    instrumenter: Arc<dyn Instrumenter>,
    stages: usize,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            pipe: Arc::new(Noop),
            instrumenter: Arc::new(NullInstrumenter),
            stages: 0,
        }
    }

    /// Instrumenter used by `instrument*` stages and inherited by nested
    /// pipelines declared afterwards
    pub fn with_instrumenter(mut self, instrumenter: Arc<dyn Instrumenter>) -> Self {
        self.instrumenter = instrumenter;
        self
    }

    pub fn instrumenter(&self) -> Arc<dyn Instrumenter> {
        Arc::clone(&self.instrumenter)
    }

    /// Appends a step that is skipped once the outcome is halted
    pub fn step(self, step: impl Step + 'static) -> Self {
        self.bind(Arc::new(step))
    }

    /// Appends a step that runs even for halted outcomes
    pub fn step_always(mut self, step: impl Step + 'static) -> Self {
        self.pipe = Arc::new(BindAny::new(self.pipe, Arc::new(step)));
        self.stages += 1;
        self
    }

    pub fn halt(self) -> Self {
        self.step(|outcome: Outcome| outcome.halt())
    }

    /// Halts, mutating the halted copy with `f`
    pub fn halt_with<F>(self, f: F) -> Self
    where
        F: Fn(&mut Outcome) + Send + Sync + 'static,
    {
        self.step(move |outcome: Outcome| outcome.halt_with(&f))
    }

    pub fn proceed(self) -> Self {
        self.step(|outcome: Outcome| outcome.proceed())
    }

    /// Proceeds, mutating the copy with `f`
    pub fn proceed_with<F>(self, f: F) -> Self
    where
        F: Fn(&mut Outcome) + Send + Sync + 'static,
    {
        self.step(move |outcome: Outcome| outcome.proceed_with(&f))
    }

    /// Nests an independent pipeline as a single step
    pub fn pipeline<F>(self, f: F) -> Self
    where
        F: FnOnce(PipelineBuilder) -> PipelineBuilder,
    {
        let nested = f(self.nested()).build();
        self.step(nested)
    }

    /// Validates the query map against `schema`
    pub fn query_schema(self, schema: Schema) -> Self {
        self.step(Validation::query(schema))
    }

    /// Validates the payload map against `schema`
    pub fn payload_schema(self, schema: Schema) -> Self {
        self.step(Validation::payload(schema))
    }

    /// Appends `step` wrapped in an instrumented span
    pub fn instrument_step(
        self,
        step: impl Step + 'static,
        label: impl Into<String>,
        attrs: Attributes,
    ) -> Self {
        let instrumented = Instrumented::new(self.instrumenter(), label, attrs, step);
        self.step(instrumented)
    }

    /// Appends a nested pipeline wrapped in an instrumented span
    pub fn instrument<F>(self, label: impl Into<String>, attrs: Attributes, f: F) -> Self
    where
        F: FnOnce(PipelineBuilder) -> PipelineBuilder,
    {
        let nested = f(self.nested()).build();
        self.instrument_step(nested, label, attrs)
    }

    pub fn build(self) -> Pipeline {
        debug!(stages = self.stages, "pipeline built");
        Pipeline {
            pipe: self.pipe,
            instrumenter: self.instrumenter,
            stages: self.stages,
        }
    }

    fn nested(&self) -> PipelineBuilder {
        PipelineBuilder::new().with_instrumenter(self.instrumenter())
    }

    fn bind(mut self, step: Arc<dyn Step>) -> Self {
        self.pipe = Arc::new(Bind::new(self.pipe, step));
        self.stages += 1;
        self
    }
}
