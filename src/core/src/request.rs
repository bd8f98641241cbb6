//! Inbound request abstraction
//!
//! A transport-neutral view of an HTTP request: enough for authenticators to read
//! credentials and for pipeline steps to read the query string, path parameters
//! and body. Server adapters build one of these per request.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Uri};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::JsonMap;

/// Inbound HTTP request
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    /// Parameters extracted by the host router (e.g. `/shops/:id`)
    path_params: JsonMap,
    body: Bytes,
}

impl Request {
    /// Create a request for the given method and URI
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            ..Default::default()
        }
    }

    /// Parse a URI string and build a request for it
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_core::Request;
    /// use http::Method;
    ///
    /// let request = Request::parse(Method::GET, "/products?page=2").unwrap();
    /// assert_eq!(request.path(), "/products");
    /// assert_eq!(request.query_param("page").as_deref(), Some("2"));
    /// ```
    pub fn parse(method: Method, uri: &str) -> Result<Self> {
        let uri: Uri = uri
            .parse()
            .map_err(|e: http::uri::InvalidUri| CoreError::invalid_uri(format!("{uri}: {e}")))?;
        Ok(Self::new(method, uri))
    }

    /// Shorthand for a GET request
    pub fn get(uri: &str) -> Result<Self> {
        Self::parse(Method::GET, uri)
    }

    /// Add a header
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::try_from(name)
            .map_err(|e| CoreError::invalid_header(format!("{name}: {e}")))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| CoreError::invalid_header(format!("{name}: {e}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Set the raw body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a router path parameter
    pub fn with_path_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw query string, if any
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn path_params(&self) -> &JsonMap {
        &self.path_params
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decoded query string pairs, in order of appearance
    pub fn query_params(&self) -> Vec<(String, String)> {
        match self.query() {
            Some(query) => url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Last value of a query parameter
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_params()
            .into_iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value)
            .last()
    }

    /// Content type without parameters, e.g. `application/json`
    pub fn media_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::trim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_are_decoded() {
        let request = Request::get("/search?q=hello%20world&tag=a&tag=b").unwrap();

        let params = request.query_params();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0], ("q".to_string(), "hello world".to_string()));
        assert_eq!(request.query_param("tag").as_deref(), Some("b"));
        assert_eq!(request.query_param("missing"), None);
    }

    #[test]
    fn test_headers() {
        let request = Request::get("/")
            .unwrap()
            .with_header("Authorization", "Bearer abc")
            .unwrap();

        assert_eq!(request.header("authorization"), Some("Bearer abc"));
        assert!(Request::get("/").unwrap().with_header("bad header", "x").is_err());
    }

    #[test]
    fn test_media_type_strips_parameters() {
        let request = Request::parse(Method::POST, "/")
            .unwrap()
            .with_header("content-type", "application/json; charset=utf-8")
            .unwrap();

        assert_eq!(request.media_type(), Some("application/json"));
    }

    #[test]
    fn test_invalid_uri() {
        assert!(matches!(
            Request::get("http://[::1"),
            Err(CoreError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_path_params() {
        let request = Request::get("/shops/12")
            .unwrap()
            .with_path_param("shop_id", "12");

        assert_eq!(request.path(), "/shops/12");
        assert_eq!(request.path_params()["shop_id"], Value::from("12"));
    }
}
