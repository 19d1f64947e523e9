//! Session validation seam. Issuing credentials is someone else's job;
//! the ingestion service only needs to map a bearer token to a user and
//! to tell "expired" apart from "never valid".

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    Valid(String),
    Expired,
    Invalid,
}

pub trait SessionValidator: Send + Sync {
    fn validate(&self, token: &str) -> SessionCheck;
}

/// Token table loaded from configuration. Tokens listed under
/// `expired_tokens` answer `Expired`, which lets integration tests and
/// local setups exercise the queue-clearing auth path.
#[derive(Debug, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, String>,
    expired: Vec<String>,
}

impl StaticTokenValidator {
    pub fn new(tokens: HashMap<String, String>, expired: Vec<String>) -> Self {
        Self { tokens, expired }
    }

    pub fn single(token: &str, user_id: &str) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(token.to_string(), user_id.to_string());
        Self {
            tokens,
            expired: Vec::new(),
        }
    }
}

impl SessionValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> SessionCheck {
        if self.expired.iter().any(|t| t == token) {
            return SessionCheck::Expired;
        }
        match self.tokens.get(token) {
            Some(user_id) => SessionCheck::Valid(user_id.clone()),
            None => SessionCheck::Invalid,
        }
    }
}
