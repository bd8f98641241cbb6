//! Authentication configuration

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use jsonwebtoken::Algorithm;
use serde::Deserialize;
use tracing::debug;

use crate::auth::{Auth, Claims};
use crate::authenticators::{Authenticator, RequestHeader, RequestQuery, DEFAULT_HEADER};
use crate::error::{AuthError, Result};
use crate::scope::Aliases;
use crate::token_store::{HashTokenStore, JwtTokenStore, TokenStore, DEFAULT_EXPIRY_WINDOW_SECS};
use gatehouse_core::Request;

/// JWT signing settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    /// Algorithm name, e.g. `RS256` or `HS256`
    ///
    /// Defaults to `HS256` with a secret and `RS256` with a public key.
    pub algorithm: Option<String>,

    /// Shared secret for HMAC algorithms
    pub secret: Option<String>,

    /// PEM encoded RSA public key
    pub public_key_pem: Option<String>,

    /// PEM encoded RSA private key, needed to issue tokens
    pub private_key_pem: Option<String>,

    /// Lifetime of issued tokens
    pub expiry_window_secs: i64,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            algorithm: None,
            secret: None,
            public_key_pem: None,
            private_key_pem: None,
            expiry_window_secs: DEFAULT_EXPIRY_WINDOW_SECS,
        }
    }
}

/// Declarative authentication settings
///
/// Without a `jwt` block tokens live in an in-memory store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Header carrying the access token
    pub header: String,

    /// Query parameter carrying the access token; takes precedence over `header`
    pub query_param: Option<String>,

    /// Scope aliases
    pub aliases: HashMap<String, Vec<String>>,

    pub jwt: Option<JwtSettings>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            query_param: None,
            aliases: HashMap::new(),
            jwt: None,
        }
    }
}

impl AuthSettings {
    /// Reads `GATEHOUSE_*` environment variables
    ///
    /// - `GATEHOUSE_AUTH_HEADER`, `GATEHOUSE_AUTH_QUERY_PARAM`
    /// - `GATEHOUSE_SCOPE_ALIASES` (JSON object of alias to scope list)
    /// - `GATEHOUSE_JWT_ALGORITHM`, `GATEHOUSE_JWT_SECRET`,
    ///   `GATEHOUSE_JWT_PUBLIC_KEY`, `GATEHOUSE_JWT_PRIVATE_KEY`,
    ///   `GATEHOUSE_JWT_EXPIRY_WINDOW`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`AuthSettings::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(header) = lookup("GATEHOUSE_AUTH_HEADER") {
            settings.header = header;
        }
        settings.query_param = lookup("GATEHOUSE_AUTH_QUERY_PARAM");

        if let Some(aliases) = lookup("GATEHOUSE_SCOPE_ALIASES") {
            settings.aliases = serde_json::from_str(&aliases).map_err(|e| {
                AuthError::Config(format!("GATEHOUSE_SCOPE_ALIASES: {}", e))
            })?;
        }

        let secret = lookup("GATEHOUSE_JWT_SECRET");
        let public_key_pem = lookup("GATEHOUSE_JWT_PUBLIC_KEY");
        if secret.is_some() || public_key_pem.is_some() {
            let mut jwt = JwtSettings {
                secret,
                public_key_pem,
                private_key_pem: lookup("GATEHOUSE_JWT_PRIVATE_KEY"),
                ..JwtSettings::default()
            };
            if let Some(algorithm) = lookup("GATEHOUSE_JWT_ALGORITHM") {
                jwt.algorithm = Some(algorithm);
            }
            if let Some(window) = lookup("GATEHOUSE_JWT_EXPIRY_WINDOW") {
                jwt.expiry_window_secs = window.parse().map_err(|_| {
                    AuthError::Config(format!(
                        "GATEHOUSE_JWT_EXPIRY_WINDOW: '{}' is not a number",
                        window
                    ))
                })?;
            }
            settings.jwt = Some(jwt);
        }

        Ok(settings)
    }
}

/// Runtime authentication configuration, shared behind an `Arc`
#[derive(Clone)]
pub struct AuthConfig {
    aliases: Aliases,
    token_store: Arc<dyn TokenStore>,
    authenticator: Arc<dyn Authenticator>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            aliases: Aliases::new(),
            token_store: Arc::new(HashTokenStore::new()),
            authenticator: Arc::new(RequestHeader::default()),
        }
    }
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from settings
    pub fn from_settings(settings: &AuthSettings) -> Result<Self> {
        let authenticator: Arc<dyn Authenticator> = match &settings.query_param {
            Some(param) => Arc::new(RequestQuery::new(param.clone())),
            None => Arc::new(RequestHeader::new(settings.header.clone())),
        };

        let token_store: Arc<dyn TokenStore> = match &settings.jwt {
            Some(jwt) => Arc::new(jwt_store(jwt)?),
            None => Arc::new(HashTokenStore::new()),
        };

        Ok(Self {
            aliases: Aliases::from_mapping(settings.aliases.clone()),
            token_store,
            authenticator,
        })
    }

    pub fn with_aliases(mut self, aliases: Aliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_token_store(mut self, store: impl TokenStore + 'static) -> Self {
        self.token_store = Arc::new(store);
        self
    }

    /// Uses an in-memory store seeded with fixed tokens
    pub fn with_token_map(self, tokens: HashMap<String, Claims>) -> Self {
        self.with_token_store(HashTokenStore::from_map(tokens))
    }

    pub fn with_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Arc::new(authenticator);
        self
    }

    pub fn aliases(&self) -> &Aliases {
        &self.aliases
    }

    pub fn token_store(&self) -> &dyn TokenStore {
        self.token_store.as_ref()
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    /// Authenticates a request end to end
    pub fn parse(&self, request: &Request) -> Result<Auth> {
        let token = self.authenticator.authenticate(request).ok_or_else(|| {
            let err = AuthError::MissingAccessToken(format!(
                "missing access token with {}",
                self.authenticator.describe()
            ));
            debug!(error = %err, "authentication failed");
            err
        })?;

        self.resolve_access_token(&token)
    }

    /// Looks up `token` and builds the principal for it
    pub fn resolve_access_token(&self, token: &str) -> Result<Auth> {
        let claims = self.token_store.get(token).map_err(|err| {
            debug!(error = %err, "authentication failed");
            err
        })?;

        Auth::new(Some(token.to_string()), claims, &self.aliases)
    }
}

fn jwt_store(settings: &JwtSettings) -> Result<JwtTokenStore> {
    let algorithm = match &settings.algorithm {
        Some(name) => Algorithm::from_str(name)
            .map_err(|_| AuthError::Config(format!("unknown JWT algorithm '{}'", name)))?,
        None if settings.secret.is_some() => Algorithm::HS256,
        None => Algorithm::RS256,
    };

    let store = match (&settings.secret, &settings.public_key_pem) {
        (Some(secret), _) => JwtTokenStore::hmac(secret.as_bytes(), algorithm)?,
        (None, Some(public)) => JwtTokenStore::rsa_pem(
            public.as_bytes(),
            settings.private_key_pem.as_deref().map(str::as_bytes),
            algorithm,
        )?,
        (None, None) => {
            return Err(AuthError::Config(
                "jwt settings need a secret or a public key".to_string(),
            ))
        }
    };

    Ok(store.with_expiry_window(settings.expiry_window_secs))
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("aliases", &self.aliases)
            .field("authenticator", &self.authenticator.describe())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = AuthSettings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.header, "authorization");
        assert!(settings.query_param.is_none());
        assert!(settings.jwt.is_none());
    }

    #[test]
    fn test_settings_from_lookup() {
        let settings = AuthSettings::from_lookup(lookup(&[
            ("GATEHOUSE_AUTH_QUERY_PARAM", "access_token"),
            ("GATEHOUSE_SCOPE_ALIASES", r#"{"admin": ["api"]}"#),
            ("GATEHOUSE_JWT_SECRET", "s3cret"),
            ("GATEHOUSE_JWT_ALGORITHM", "HS512"),
            ("GATEHOUSE_JWT_EXPIRY_WINDOW", "60"),
        ]))
        .unwrap();

        assert_eq!(settings.query_param.as_deref(), Some("access_token"));
        assert_eq!(settings.aliases["admin"], vec!["api".to_string()]);
        let jwt = settings.jwt.unwrap();
        assert_eq!(jwt.algorithm.as_deref(), Some("HS512"));
        assert_eq!(jwt.expiry_window_secs, 60);
    }

    #[test]
    fn test_settings_reject_bad_values() {
        assert!(matches!(
            AuthSettings::from_lookup(lookup(&[("GATEHOUSE_SCOPE_ALIASES", "[")])),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            AuthSettings::from_lookup(lookup(&[
                ("GATEHOUSE_JWT_SECRET", "s"),
                ("GATEHOUSE_JWT_EXPIRY_WINDOW", "soon"),
            ])),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_settings_deserialize() {
        let settings: AuthSettings = serde_json::from_value(json!({
            "header": "x-token",
            "jwt": {"algorithm": "HS256", "secret": "s"}
        }))
        .unwrap();

        assert_eq!(settings.header, "x-token");
        assert_eq!(settings.jwt.unwrap().expiry_window_secs, DEFAULT_EXPIRY_WINDOW_SECS);
    }

    #[test]
    fn test_from_settings_with_jwt() {
        let settings: AuthSettings = serde_json::from_value(json!({
            "aliases": {"admin": ["api.products"]},
            "jwt": {"algorithm": "HS256", "secret": "s"}
        }))
        .unwrap();
        let config = AuthConfig::from_settings(&settings).unwrap();

        let token = config
            .token_store()
            .set(json!({"scopes": ["admin"]}).as_object().cloned().unwrap())
            .unwrap();
        let request = Request::get("/")
            .unwrap()
            .with_header("authorization", &format!("Bearer {}", token))
            .unwrap();

        let auth = config.parse(&request).unwrap();
        assert_eq!(auth.scopes().to_strings(), vec!["api.products"]);
    }

    #[test]
    fn test_secret_alone_selects_hmac() {
        let settings =
            AuthSettings::from_lookup(lookup(&[("GATEHOUSE_JWT_SECRET", "s3cret")])).unwrap();
        assert!(settings.jwt.as_ref().unwrap().algorithm.is_none());

        let config = AuthConfig::from_settings(&settings).unwrap();
        let token = config
            .token_store()
            .set(json!({"scopes": ["api"]}).as_object().cloned().unwrap())
            .unwrap();
        let auth = config.resolve_access_token(&token).unwrap();
        assert_eq!(auth.scopes().to_strings(), vec!["api"]);

        let store = jwt_store(settings.jwt.as_ref().unwrap()).unwrap();
        assert_eq!(store.algorithm(), Algorithm::HS256);
    }

    #[test]
    fn test_from_settings_errors() {
        let unknown: AuthSettings =
            serde_json::from_value(json!({"jwt": {"algorithm": "XX1", "secret": "s"}})).unwrap();
        assert!(matches!(AuthConfig::from_settings(&unknown), Err(AuthError::Config(_))));

        let keyless: AuthSettings = serde_json::from_value(json!({"jwt": {}})).unwrap();
        assert!(matches!(AuthConfig::from_settings(&keyless), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_parse_errors() {
        let config = AuthConfig::new();
        let request = Request::get("/").unwrap();

        assert!(matches!(config.parse(&request), Err(AuthError::MissingAccessToken(_))));
        assert!(matches!(
            config.resolve_access_token("nope"),
            Err(AuthError::InvalidAccessToken(_))
        ));
    }

    #[test]
    fn test_with_token_map() {
        let mut tokens = HashMap::new();
        tokens.insert("admin".to_string(), json!({"scopes": "a b"}).as_object().cloned().unwrap());
        let config = AuthConfig::new()
            .with_token_map(tokens)
            .with_authenticator(RequestQuery::new("token"));

        let auth = config.parse(&Request::get("/?token=admin").unwrap()).unwrap();
        assert_eq!(auth.access_token(), Some("admin"));
        assert_eq!(auth.scopes().len(), 2);
    }
}
