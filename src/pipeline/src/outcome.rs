//! Railway value threaded through pipelines

use std::collections::BTreeMap;
use std::sync::Arc;

use gatehouse_authz::Auth;
use gatehouse_core::{JsonMap, Request, Response};
use http::StatusCode;
use serde_json::Value;

/// Validation errors keyed by field path, e.g. `$.id`
pub type Errors = BTreeMap<String, Vec<String>>;

/// Railway track of an [`Outcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Success,
    Halt,
}

/// Request and response state flowing through a pipeline
///
/// Transitions (`proceed`, `halt`, `copy_with` and their `_with` forms)
/// take `&self` and return a fresh copy, so an outcome handed to a step is
/// never changed behind the caller's back. The request is shared; every
/// other collection is cloned.
///
/// # Examples
///
/// ```
/// use gatehouse_pipeline::Outcome;
/// use serde_json::json;
///
/// let start = Outcome::default();
/// let halted = start.halt_with(|o| {
///     o.query.insert("page".to_string(), json!(2));
/// });
///
/// assert!(halted.is_halted());
/// assert!(!start.is_halted());
/// assert!(start.query.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Outcome {
    state: State,
    request: Arc<Request>,
    pub response: Response,
    /// Object the action is operating on, handed to serializers
    pub object: Option<Value>,
    pub data: JsonMap,
    pub query: JsonMap,
    pub payload: JsonMap,
    pub context: JsonMap,
    pub auth: Option<Arc<Auth>>,
    pub errors: Errors,
}

impl Default for Outcome {
    fn default() -> Self {
        Self::new(Request::default())
    }
}

impl Outcome {
    /// Wraps an inbound request in a successful outcome with a 200 response
    pub fn new(request: Request) -> Self {
        Self::from_shared(Arc::new(request))
    }

    pub fn from_shared(request: Arc<Request>) -> Self {
        Self {
            state: State::Success,
            request,
            response: Response::default(),
            object: None,
            data: JsonMap::new(),
            query: JsonMap::new(),
            payload: JsonMap::new(),
            context: JsonMap::new(),
            auth: None,
            errors: Errors::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == State::Halt
    }

    /// No validation errors have been recorded, whatever the state
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn shared_request(&self) -> Arc<Request> {
        Arc::clone(&self.request)
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn auth(&self) -> Option<&Auth> {
        self.auth.as_deref()
    }

    /// Value stored in the free-form `data` map
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Copy on the success track
    pub fn proceed(&self) -> Outcome {
        self.transition(State::Success)
    }

    /// Copy on the success track, mutated by `f`
    pub fn proceed_with<F>(&self, f: F) -> Outcome
    where
        F: FnOnce(&mut Outcome),
    {
        let mut next = self.proceed();
        f(&mut next);
        next
    }

    /// Copy on the halt track
    pub fn halt(&self) -> Outcome {
        self.transition(State::Halt)
    }

    /// Copy on the halt track, mutated by `f`
    pub fn halt_with<F>(&self, f: F) -> Outcome
    where
        F: FnOnce(&mut Outcome),
    {
        let mut next = self.halt();
        f(&mut next);
        next
    }

    /// Halted copy with the response status replaced
    pub fn halt_with_status(&self, status: StatusCode) -> Outcome {
        self.halt_with(|o| o.response.set_status(status))
    }

    /// Mutated copy on the current track
    pub fn copy_with<F>(&self, f: F) -> Outcome
    where
        F: FnOnce(&mut Outcome),
    {
        let mut next = self.clone();
        f(&mut next);
        next
    }

    fn transition(&self, state: State) -> Outcome {
        Outcome {
            state,
            ..self.clone()
        }
    }
}

impl From<Request> for Outcome {
    fn from(request: Request) -> Self {
        Outcome::new(request)
    }
}
