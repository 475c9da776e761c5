//! Shared application state handed to every handler.

use std::sync::Arc;

use dockhand_core::ServiceManager;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// API credentials, kept only as SHA-256 digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    username_hash: String,
    password_hash: String,
}

impl ApiCredentials {
    pub fn new(username: &str, password: &SecretString) -> Self {
        Self {
            username_hash: hash_credential(username),
            password_hash: hash_credential(password.expose_secret()),
        }
    }

    /// Whether a presented username/password pair matches
    pub fn verify(&self, username: &str, password: &str) -> bool {
        // Both halves are always hashed
        let user_ok = hash_credential(username) == self.username_hash;
        let pass_ok = hash_credential(password) == self.password_hash;
        user_ok & pass_ok
    }
}

/// Compute SHA-256 hash of a credential (lowercase hex).
fn hash_credential(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ServiceManager>,
    pub auth: Arc<ApiCredentials>,
}

impl AppState {
    pub fn new(manager: ServiceManager, auth: ApiCredentials) -> Self {
        Self {
            manager: Arc::new(manager),
            auth: Arc::new(auth),
        }
    }
}
