//! JSON Web Token store

use std::fmt;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde_json::Value;
use tracing::debug;

use super::TokenStore;
use crate::auth::Claims;
use crate::error::{AuthError, Result};

/// Default lifetime of issued tokens, in seconds
pub const DEFAULT_EXPIRY_WINDOW_SECS: i64 = 10;

/// Stateless store that issues and verifies signed JWTs
///
/// Issued tokens get `exp`, `iat` and a random `jti` unless the caller
/// provides them. Verification checks the signature and expiry with no
/// leeway.
pub struct JwtTokenStore {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    encoding_key: Option<EncodingKey>,
    expiry_window: i64,
}

impl JwtTokenStore {
    /// Shared-secret store for the HMAC family (HS256, HS384, HS512)
    pub fn hmac(secret: &[u8], algorithm: Algorithm) -> Result<Self> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::InvalidKey(format!(
                "{:?} is not an HMAC algorithm",
                algorithm
            )));
        }

        Ok(Self {
            algorithm,
            decoding_key: DecodingKey::from_secret(secret),
            encoding_key: Some(EncodingKey::from_secret(secret)),
            expiry_window: DEFAULT_EXPIRY_WINDOW_SECS,
        })
    }

    /// RSA store; without a private key it can only verify tokens
    pub fn rsa_pem(
        public_pem: &[u8],
        private_pem: Option<&[u8]>,
        algorithm: Algorithm,
    ) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| AuthError::InvalidKey(format!("public key: {}", e)))?;
        let encoding_key = private_pem
            .map(EncodingKey::from_rsa_pem)
            .transpose()
            .map_err(|e| AuthError::InvalidKey(format!("private key: {}", e)))?;

        Ok(Self {
            algorithm,
            decoding_key,
            encoding_key,
            expiry_window: DEFAULT_EXPIRY_WINDOW_SECS,
        })
    }

    /// Overrides the lifetime of issued tokens
    pub fn with_expiry_window(mut self, seconds: i64) -> Self {
        self.expiry_window = seconds;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn can_issue(&self) -> bool {
        self.encoding_key.is_some()
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation
    }
}

impl TokenStore for JwtTokenStore {
    fn get(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "rejected access token");
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::ExpiredAccessToken(e.to_string()),
                    _ => AuthError::InvalidAccessToken(e.to_string()),
                }
            })
    }

    fn set(&self, claims: Claims) -> Result<String> {
        let key = self.encoding_key.as_ref().ok_or(AuthError::MissingPrivateKey)?;

        let now = Utc::now().timestamp();
        let mut jti = [0u8; 7];
        rand::thread_rng().fill_bytes(&mut jti);

        let mut payload = Claims::new();
        payload.insert("exp".to_string(), Value::from(now + self.expiry_window));
        payload.insert("iat".to_string(), Value::from(now));
        payload.insert("jti".to_string(), Value::from(hex::encode(jti)));
        payload.extend(claims);

        encode(&Header::new(self.algorithm), &payload, key)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))
    }
}

impl fmt::Debug for JwtTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenStore")
            .field("algorithm", &self.algorithm)
            .field("can_issue", &self.can_issue())
            .field("expiry_window", &self.expiry_window)
            .finish()
    }
}
