//! Credential extraction from inbound requests

use std::fmt;

use gatehouse_core::Request;

/// Default header carrying the access token
pub const DEFAULT_HEADER: &str = "authorization";

/// Pulls a raw access token out of a request
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, request: &Request) -> Option<String>;

    /// Human readable description used in error messages
    fn describe(&self) -> String {
        "custom authenticator".to_string()
    }
}

impl<F> Authenticator for F
where
    F: Fn(&Request) -> Option<String> + Send + Sync,
{
    fn authenticate(&self, request: &Request) -> Option<String> {
        self(request)
    }
}

/// Reads the last whitespace-separated word of a header
///
/// `Authorization: Bearer abc` yields `abc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader(pub String);

impl RequestHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Default for RequestHeader {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER)
    }
}

impl Authenticator for RequestHeader {
    fn authenticate(&self, request: &Request) -> Option<String> {
        request
            .header(&self.0)
            .and_then(|value| value.split_whitespace().last())
            .map(String::from)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RequestHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "['{}' in request headers]", self.0)
    }
}

/// Reads a query string parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestQuery(pub String);

impl RequestQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Authenticator for RequestQuery {
    fn authenticate(&self, request: &Request) -> Option<String> {
        request.query_param(&self.0).filter(|value| !value.is_empty())
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RequestQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "['{}' in request query string]", self.0)
    }
}
