//! Authenticated principals

use serde_json::Value;
use tracing::debug;

use crate::authorizers::AuthorizerTree;
use crate::error::{AuthError, Result};
use crate::scope::{Aliases, Scope, Scopes};
use gatehouse_core::JsonMap;

/// Decoded claims of an access token
pub type Claims = JsonMap;

/// Claim holding the granted scopes
pub const SCOPES_CLAIM: &str = "scopes";

/// Reads granted scope strings from claims
///
/// Accepts a JSON array of strings or a single space-delimited string, under
/// `scopes` or the OAuth-style `scope`.
pub fn extract_scopes(claims: &Claims) -> Vec<String> {
    match claims.get(SCOPES_CLAIM).or_else(|| claims.get("scope")) {
        Some(Value::String(scopes)) => scopes.split_whitespace().map(String::from).collect(),
        Some(Value::Array(scopes)) => scopes
            .iter()
            .filter_map(|s| s.as_str())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Authorization context for one request
///
/// Built from validated claims and the configured [`Aliases`]; read-only
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct Auth {
    access_token: Option<String>,
    claims: Claims,
    scopes: Scopes,
}

impl Auth {
    /// Claimed scopes that do not parse are skipped, so one bad entry does
    /// not void the others. Alias targets are configuration and must parse.
    pub fn new(access_token: Option<String>, claims: Claims, aliases: &Aliases) -> Result<Self> {
        let claimed = extract_scopes(&claims).into_iter().filter(|raw| {
            if aliases.is_alias(raw) {
                return true;
            }
            match Scope::parse(raw) {
                Ok(_) => true,
                Err(err) => {
                    debug!(scope = %raw, error = %err, "ignoring unparseable claimed scope");
                    false
                }
            }
        });
        let scopes = aliases.map(claimed)?;
        Ok(Self {
            access_token,
            claims,
            scopes,
        })
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    /// Whether a granted scope covers `scope`
    pub fn can(&self, scope: &Scope) -> bool {
        self.scopes.can_scope(scope)
    }

    /// Like [`Auth::can`], but an absent requirement always passes
    pub fn is_authorized(&self, scope: Option<&Scope>) -> bool {
        scope.map_or(true, |scope| self.can(scope))
    }

    /// Checks `required` against the granted scopes, then runs the
    /// authorizer tree with the most specific granted scope
    pub fn authorize<P>(
        &self,
        required: &Scope,
        authorizer: &AuthorizerTree<Auth, P>,
        params: &P,
    ) -> Result<()> {
        let granted = self.scopes.resolve(required).ok_or_else(|| {
            debug!(required = %required, provided = %self.scopes, "insufficient scopes");
            AuthError::InsufficientScopes {
                required: required.to_string(),
                provided: self.scopes.to_string(),
            }
        })?;

        if !authorizer.authorized(granted, self, params) {
            debug!(scope = %granted, "authorizer refused access");
            return Err(AuthError::ForbiddenAccess(
                "no permissions to access this resource".to_string(),
            ));
        }

        Ok(())
    }
}
