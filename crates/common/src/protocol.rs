//! Request and response types exchanged over the public HTTP API.
//!
//! Byte fields travel as standard (padded) base64 strings inside JSON bodies.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Encrypt / decrypt endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /encrypt` and `POST /decrypt`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRequest {
    /// Plaintext (encrypt) or ciphertext envelope (decrypt).
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

/// Successful response body for `POST /encrypt` and `POST /decrypt`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadResponse {
    /// Ciphertext envelope (encrypt) or recovered plaintext (decrypt).
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

pub type EncryptRequest = PayloadRequest;
pub type EncryptResponse = PayloadResponse;
pub type DecryptRequest = PayloadRequest;
pub type DecryptResponse = PayloadResponse;

// Payloads may be secrets; only their size is printable.
impl std::fmt::Debug for PayloadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadRequest")
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl std::fmt::Debug for PayloadResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadResponse")
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.message())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status. Always `"ok"` once the server is accepting.
    pub status: String,
    /// Crate version of the running binary.
    pub version: String,
    /// Non-secret identifier of the loaded master key.
    pub key_fingerprint: String,
}

/// Serde adapter for `Vec<u8>` fields encoded as standard base64.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|_| de::Error::custom("payload is not valid base64"))
    }
}
