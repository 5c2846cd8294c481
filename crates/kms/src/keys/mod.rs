//! Master key sources.
//!
//! A [`KeySource`] has a single job: produce the raw master key bytes once, at
//! startup. The key manager validates them; sources only fetch and decode.
//!
//! # Backends
//!
//! - [`FileKeySource`] — a local key file (raw bytes or base64 text).
//! - [`SecretsManagerKeySource`] — an AWS Secrets Manager secret.
//! - Any `Fn() -> Result<Vec<u8>, E>` closure, mainly for tests and embedding.
//!
//! # Security invariants
//!
//! - Fetched bytes are returned in a [`Zeroizing`] buffer so intermediate
//!   copies are wiped once the key manager has taken its own copy.
//! - Errors name the key location, never its contents.

pub mod file;
pub mod secrets_manager;

pub use file::FileKeySource;
pub use secrets_manager::SecretsManagerKeySource;

use std::future::Future;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{Config, KeySourceKind};
use crate::crypto::{KeyManager, KeyManagerError};

/// Boxed error type returned by key sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Capability to fetch the master key bytes.
pub trait KeySource {
    /// Fetch the raw key bytes. Called exactly once per process.
    fn fetch_key(&self) -> impl Future<Output = Result<Zeroizing<Vec<u8>>, BoxError>> + Send;
}

impl<F, E> KeySource for F
where
    F: Fn() -> Result<Vec<u8>, E>,
    E: Into<BoxError>,
{
    fn fetch_key(&self) -> impl Future<Output = Result<Zeroizing<Vec<u8>>, BoxError>> + Send {
        std::future::ready(self().map(Zeroizing::new).map_err(Into::into))
    }
}

/// Errors produced while reading key material from a backend.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    /// The key file could not be read.
    #[error("failed to read key file {path}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The key text is not valid base64.
    #[error("key material at {location} is not valid base64")]
    InvalidBase64 { location: String },

    /// The Secrets Manager call failed.
    #[error("failed to fetch secret {secret_id} from Secrets Manager")]
    FetchSecret {
        secret_id: String,
        #[source]
        source: aws_sdk_secretsmanager::Error,
    },

    /// The secret holds neither a binary nor a string value.
    #[error("secret {secret_id} has no value")]
    EmptySecret { secret_id: String },
}

/// Decode base64 key text, ignoring surrounding whitespace.
pub(crate) fn decode_base64_key(text: &[u8], location: &str) -> Result<Zeroizing<Vec<u8>>, KeyLoadError> {
    let invalid = || KeyLoadError::InvalidBase64 {
        location: location.to_owned(),
    };
    let text = std::str::from_utf8(text).map_err(|_| invalid())?;
    STANDARD
        .decode(text.trim())
        .map(Zeroizing::new)
        .map_err(|_| invalid())
}

/// Build the [`KeyManager`] from the key source selected in `cfg`.
///
/// # Errors
///
/// Returns an error if the source cannot be read or yields an invalid key.
pub async fn load_key_manager(cfg: &Config) -> anyhow::Result<KeyManager> {
    let result: Result<KeyManager, KeyManagerError> = match cfg.key_source {
        KeySourceKind::File => {
            let path = cfg
                .key_file
                .as_deref()
                .context("KEY_FILE is required when KEY_SOURCE=file")?;
            KeyManager::load(&FileKeySource::new(path, cfg.key_file_encoding)).await
        }
        KeySourceKind::SecretsManager => {
            let secret_id = cfg
                .key_secret_id
                .as_deref()
                .context("KEY_SECRET_ID is required when KEY_SOURCE=secrets-manager")?;
            KeyManager::load(&SecretsManagerKeySource::from_env(secret_id).await).await
        }
    };
    result.context("failed to load master key")
}
