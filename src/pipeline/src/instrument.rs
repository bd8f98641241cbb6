//! Instrumentation hooks around pipeline stages

use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, info_span};

use crate::outcome::Outcome;

/// Deferred stage execution handed to an [`Instrumenter`]
pub type Run<'a> = Box<dyn FnOnce() -> Outcome + 'a>;

/// Ordered key/value attributes attached to an instrumented stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an attribute
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.0.iter_mut().find(|entry| entry.0 == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| entry.0 == key)
            .map(|entry| entry.1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Wraps the execution of a named pipeline stage
pub trait Instrumenter: Send + Sync {
    fn instrument(&self, label: &str, attrs: &Attributes, run: Run<'_>) -> Outcome;
}

/// Runs stages without observing them
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInstrumenter;

impl Instrumenter for NullInstrumenter {
    fn instrument(&self, _label: &str, _attrs: &Attributes, run: Run<'_>) -> Outcome {
        run()
    }
}

/// Opens a `tracing` span per stage and logs its duration and result
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInstrumenter;

impl Instrumenter for TracingInstrumenter {
    fn instrument(&self, label: &str, attrs: &Attributes, run: Run<'_>) -> Outcome {
        let span = info_span!("stage", label = %label, attrs = %attrs);
        let _guard = span.enter();

        let started = Instant::now();
        let outcome = run();

        debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            status = outcome.status().as_u16(),
            halted = outcome.is_halted(),
            "stage finished"
        );
        outcome
    }
}

/// Records every instrumented stage, outermost first
#[derive(Debug, Default)]
pub struct RecordingInstrumenter {
    events: Mutex<Vec<(String, Attributes)>>,
}

impl RecordingInstrumenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Attributes)> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events().into_iter().map(|(label, _)| label).collect()
    }
}

impl Instrumenter for RecordingInstrumenter {
    fn instrument(&self, label: &str, attrs: &Attributes, run: Run<'_>) -> Outcome {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((label.to_string(), attrs.clone()));
        run()
    }
}
