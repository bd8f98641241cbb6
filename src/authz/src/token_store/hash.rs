//! In-memory token store

use std::collections::HashMap;

use dashmap::DashMap;
use rand::RngCore;
use tracing::debug;

use super::TokenStore;
use crate::auth::Claims;
use crate::error::{AuthError, Result};

/// In-memory token store keyed by random hex tokens
#[derive(Debug, Default)]
pub struct HashTokenStore {
    tokens: DashMap<String, Claims>,
}

impl HashTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with fixed tokens
    pub fn from_map(tokens: HashMap<String, Claims>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Registers claims under a chosen token
    pub fn insert(&self, token: impl Into<String>, claims: Claims) {
        self.tokens.insert(token.into(), claims);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenStore for HashTokenStore {
    fn get(&self, token: &str) -> Result<Claims> {
        match self.tokens.get(token) {
            Some(claims) => Ok(claims.value().clone()),
            None => {
                debug!("unknown access token");
                Err(AuthError::InvalidAccessToken("unknown access token".to_string()))
            }
        }
    }

    fn set(&self, claims: Claims) -> Result<String> {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        self.tokens.insert(token.clone(), claims);
        Ok(token)
    }
}
