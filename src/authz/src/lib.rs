//! # Gatehouse Authorization
//!
//! Authentication and hierarchical scope-based authorization.
//!
//! ## Features
//!
//! - **Hierarchical scopes** with wildcards, value sets and templates
//! - **Scope trees** that only hand out declared scope paths
//! - **Aliases** mapping short tokens to canonical scopes
//! - **Pluggable token stores** (in-memory or JWT)
//! - **Authorizer trees** running ownership checks per scope segment
//!
//! ## Example
//!
//! ```rust
//! use gatehouse_authz::{AuthConfig, HashTokenStore, Scope, TokenStore};
//! use gatehouse_core::Request;
//! use serde_json::json;
//!
//! let store = HashTokenStore::new();
//! let token = store
//!     .set(json!({"scopes": ["api.products"]}).as_object().cloned().unwrap())
//!     .unwrap();
//! let config = AuthConfig::new().with_token_store(store);
//!
//! let request = Request::get("/products")
//!     .unwrap()
//!     .with_header("authorization", &format!("Bearer {}", token))
//!     .unwrap();
//!
//! let auth = config.parse(&request).unwrap();
//! assert!(auth.can(&Scope::wrap("api.products.read").unwrap()));
//! ```

pub mod auth;
pub mod authenticators;
pub mod authorizers;
pub mod config;
pub mod error;
pub mod scope;
pub mod token_store;

// Re-export commonly used types
pub use auth::{extract_scopes, Auth, Claims};
pub use authenticators::{Authenticator, RequestHeader, RequestQuery};
pub use authorizers::AuthorizerTree;
pub use config::{AuthConfig, AuthSettings, JwtSettings};
pub use error::{AuthError, Result};
pub use scope::{Aliases, IntoScope, Node, Scope, ScopeError, ScopeTree, Scopes};
pub use token_store::{HashTokenStore, JwtTokenStore, TokenStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
