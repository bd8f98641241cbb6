//! Access token storage
//!
//! A token store turns an opaque access token into claims and issues new
//! tokens for a set of claims. Stores are shared across requests, so they
//! must be `Send + Sync`.

mod hash;
mod jwt;

pub use hash::HashTokenStore;
pub use jwt::{JwtTokenStore, DEFAULT_EXPIRY_WINDOW_SECS};

use crate::auth::Claims;
use crate::error::Result;

/// Token store trait
pub trait TokenStore: Send + Sync {
    /// Claims for `token`
    ///
    /// Unknown or malformed tokens are `InvalidAccessToken`, expired ones
    /// are `ExpiredAccessToken`.
    fn get(&self, token: &str) -> Result<Claims>;

    /// Issue a token carrying `claims`
    fn set(&self, claims: Claims) -> Result<String>;
}
