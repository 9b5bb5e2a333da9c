//! In-memory session registry.
//!
//! Maps opaque session tokens to the owning user's email. Tokens live until
//! revoked; nothing is persisted, so a restart logs everyone out.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Token byte length before hex encoding (32 bytes = 64 hex chars).
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a fresh random token to `email` and return the token.
    pub fn create(&self, email: &str) -> String {
        let mut sessions = self.sessions.lock();
        let token = loop {
            let candidate = generate_token();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        sessions.insert(token.clone(), email.to_owned());
        tracing::debug!(active = sessions.len(), "Session created");
        token
    }

    /// Email bound to `token`, if any.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.sessions.lock().get(token).cloned()
    }

    /// Drop the binding for `token`. Returns whether one existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generate a random session token (hex-encoded).
fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}
