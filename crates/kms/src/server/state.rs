//! Shared application state injected into every Axum handler.

use crate::crypto::KeyManager;

/// Application state shared across all request handlers.
///
/// Cheap to clone: the key manager is `Arc`-backed and immutable, so handlers
/// use it concurrently without locking.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Owner of the master key.
    pub key_manager: KeyManager,
    /// Whether decrypt failures report malformed vs. unauthenticated input.
    pub distinguish_decrypt_errors: bool,
}

impl AppState {
    /// Create a new [`AppState`] around a loaded key manager.
    pub fn new(key_manager: KeyManager, distinguish_decrypt_errors: bool) -> Self {
        Self {
            key_manager,
            distinguish_decrypt_errors,
        }
    }
}
