//! AES-256-GCM-SIV envelope encryption under the master key.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant.
//! Every envelope gets a fresh random 96-bit nonce; should two nonces ever
//! collide, the only leak is whether the two plaintexts were equal.
//!
//! **Do NOT substitute plain AES-256-GCM with random nonces without revisiting
//! the collision bound.** GCM nonce reuse breaks both confidentiality and
//! authentication.

use std::sync::Arc;

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Key, Nonce,
};
use thiserror::Error;

use super::key::MasterKey;
use crate::keys::{BoxError, KeySource};

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the AES-GCM-SIV authentication tag.
pub const TAG_LEN: usize = 16;

/// Shortest envelope that can possibly be valid: a nonce and the tag of an
/// empty plaintext.
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN;

/// Errors produced by the key manager.
#[derive(Debug, Error)]
pub enum KeyManagerError {
    /// The key source could not produce key bytes.
    #[error("key source failed")]
    KeySource(#[source] BoxError),

    /// The key material has the wrong size.
    #[error("invalid master key: expected {expected} bytes, got {actual}")]
    InvalidKey { expected: usize, actual: usize },

    /// The envelope is too short to contain a nonce and a tag.
    #[error("malformed ciphertext: envelope shorter than {MIN_ENVELOPE_LEN} bytes")]
    MalformedCiphertext,

    /// The envelope failed integrity verification.
    #[error("ciphertext authentication failed")]
    Authentication,

    /// The backend failed while producing ciphertext.
    #[error("encryption failed: {0}")]
    Encryption(&'static str),
}

impl KeyManagerError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            KeyManagerError::KeySource(_) => "key_source",
            KeyManagerError::InvalidKey { .. } => "invalid_key",
            KeyManagerError::MalformedCiphertext => "malformed_ciphertext",
            KeyManagerError::Authentication => "authentication",
            KeyManagerError::Encryption(_) => "encryption",
        }
    }
}

/// Encrypts and decrypts payloads under a single master key.
///
/// Immutable after construction and cheap to clone; every clone shares the
/// same key.
#[derive(Clone, Debug)]
pub struct KeyManager {
    key: Arc<MasterKey>,
}

impl KeyManager {
    /// Fetch key bytes from `source` once and build a manager around them.
    ///
    /// # Errors
    ///
    /// Returns [`KeyManagerError::KeySource`] if the source fails and
    /// [`KeyManagerError::InvalidKey`] if the key is not
    /// [`KEY_LEN`](super::key::KEY_LEN) bytes.
    pub async fn load<S: KeySource>(source: &S) -> Result<Self, KeyManagerError> {
        let bytes = source
            .fetch_key()
            .await
            .map_err(KeyManagerError::KeySource)?;
        Self::from_key_bytes(&bytes)
    }

    /// Build a manager from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyManagerError::InvalidKey`] if `bytes` is not
    /// [`KEY_LEN`](super::key::KEY_LEN) bytes.
    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self, KeyManagerError> {
        Ok(Self {
            key: Arc::new(MasterKey::from_slice(bytes)?),
        })
    }

    /// Hex fingerprint of the master key.
    pub fn fingerprint(&self) -> &str {
        self.key.fingerprint()
    }

    /// Seal `plaintext` and return the envelope `nonce || ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyManagerError::Encryption`] if the OS random source fails or
    /// the AEAD rejects the input (unreachable for in-memory sizes).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyManagerError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|_| KeyManagerError::Encryption("nonce generation failed"))?;

        let sealed = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| KeyManagerError::Encryption("aead seal failed"))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&sealed);
        Ok(envelope)
    }

    /// Open an envelope produced by [`KeyManager::encrypt`].
    ///
    /// The tag is verified before any plaintext is released.
    ///
    /// # Errors
    ///
    /// Returns [`KeyManagerError::MalformedCiphertext`] if the envelope is shorter
    /// than [`MIN_ENVELOPE_LEN`], and [`KeyManagerError::Authentication`] if the tag
    /// does not verify (tampering, corruption, or a different key).
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>, KeyManagerError> {
        if envelope.len() < MIN_ENVELOPE_LEN {
            return Err(KeyManagerError::MalformedCiphertext);
        }
        let (nonce, sealed) = envelope.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| KeyManagerError::Authentication)
    }

    fn cipher(&self) -> Aes256GcmSiv {
        Aes256GcmSiv::new(Key::<Aes256GcmSiv>::from_slice(&self.key.expose()[..]))
    }
}
