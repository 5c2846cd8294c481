//! [`SecretsManagerKeySource`]: fetches the master key from AWS Secrets Manager.

use aws_sdk_secretsmanager::Client;
use tracing::debug;
use zeroize::Zeroizing;

use super::{decode_base64_key, BoxError, KeyLoadError, KeySource};

/// Fetches the master key from a Secrets Manager secret.
///
/// A `SecretBinary` value is used as the raw key. A `SecretString` value must
/// hold the key as standard base64.
#[derive(Debug, Clone)]
pub struct SecretsManagerKeySource {
    client: Client,
    secret_id: String,
}

impl SecretsManagerKeySource {
    pub fn new(client: Client, secret_id: impl Into<String>) -> Self {
        Self {
            client,
            secret_id: secret_id.into(),
        }
    }

    /// Build a client from the standard AWS environment (region, credentials
    /// chain, endpoint overrides).
    pub async fn from_env(secret_id: impl Into<String>) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config), secret_id)
    }
}

impl KeySource for SecretsManagerKeySource {
    async fn fetch_key(&self) -> Result<Zeroizing<Vec<u8>>, BoxError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|e| KeyLoadError::FetchSecret {
                secret_id: self.secret_id.clone(),
                source: aws_sdk_secretsmanager::Error::from(e),
            })?;
        debug!(secret_id = %self.secret_id, version_id = ?output.version_id(), "secret fetched");

        if let Some(blob) = output.secret_binary() {
            return Ok(Zeroizing::new(blob.as_ref().to_vec()));
        }
        if let Some(text) = output.secret_string() {
            return Ok(decode_base64_key(text.as_bytes(), &self.secret_id)?);
        }
        Err(KeyLoadError::EmptySecret {
            secret_id: self.secret_id.clone(),
        }
        .into())
    }
}
