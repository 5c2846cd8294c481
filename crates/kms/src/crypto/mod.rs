//! Master key custody and AES-256-GCM-SIV envelope encryption.
//!
//! This module is intentionally free of HTTP dependencies. The router calls
//! [`KeyManager::encrypt`] and [`KeyManager::decrypt`] and never sees the key.
//!
//! # Envelope format
//!
//! ```text
//! nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```

pub mod cipher;
pub mod key;

pub use cipher::{KeyManager, KeyManagerError};
