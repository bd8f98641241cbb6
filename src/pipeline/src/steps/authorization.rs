use std::sync::Arc;

use gatehouse_authz::scope::ScopeResult;
use gatehouse_authz::{AuthConfig, IntoScope, Scope};
use gatehouse_core::JsonMap;
use http::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::outcome::Outcome;
use crate::pipeline::Step;

/// Authenticates the request and checks it against a required scope
///
/// Missing, unknown, malformed or expired credentials halt with
/// `401 Unauthorized`; credentials whose scopes do not cover the requirement
/// halt with `403 Forbidden`. On success the principal is attached to the
/// outcome.
///
/// A templated scope such as `shop.<shop_id>.products` is expanded per
/// request from the path parameters, then the query. A template that cannot
/// be expanded halts with `403 Forbidden`.
#[derive(Debug, Clone)]
pub struct AuthorizationStep {
    config: Arc<AuthConfig>,
    scope: Scope,
}

impl AuthorizationStep {
    pub fn new(config: Arc<AuthConfig>, scope: impl IntoScope) -> ScopeResult<Self> {
        Ok(Self {
            config,
            scope: scope.into_scope()?,
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Required scope for this request, with template markers filled in
    pub fn required_scope(&self, outcome: &Outcome) -> ScopeResult<Scope> {
        if !self.scope.is_template() {
            return Ok(self.scope.clone());
        }

        let request = outcome.request();
        let mut attrs: JsonMap = outcome.query.clone();
        for (key, value) in request.query_params() {
            attrs.entry(key).or_insert(Value::String(value));
        }
        attrs.extend(request.path_params().clone());

        self.scope.expand(&attrs)
    }
}

impl Step for AuthorizationStep {
    fn call(&self, outcome: Outcome) -> Outcome {
        let Some(token) = self.config.authenticator().authenticate(outcome.request()) else {
            debug!(
                scope = %self.scope,
                authenticator = %self.config.authenticator().describe(),
                "halting: missing access token"
            );
            return outcome.halt_with_status(StatusCode::UNAUTHORIZED);
        };

        let auth = match self.config.resolve_access_token(&token) {
            Ok(auth) => auth,
            Err(err) => {
                debug!(scope = %self.scope, error = %err, "halting: access token rejected");
                return outcome.halt_with_status(StatusCode::UNAUTHORIZED);
            }
        };

        let required = match self.required_scope(&outcome) {
            Ok(required) => required,
            Err(err) => {
                debug!(scope = %self.scope, error = %err, "halting: cannot expand required scope");
                return outcome.halt_with_status(StatusCode::FORBIDDEN);
            }
        };

        if !auth.can(&required) {
            debug!(
                required = %required,
                provided = %auth.scopes(),
                "halting: insufficient scopes"
            );
            return outcome.halt_with_status(StatusCode::FORBIDDEN);
        }

        outcome.proceed_with(|o| o.auth = Some(Arc::new(auth)))
    }
}
