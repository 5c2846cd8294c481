//! [`MasterKey`]: the in-memory master key and its public fingerprint.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::cipher::KeyManagerError;

/// Byte length of the AES-256 master key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Message fed to the fingerprint HMAC.
const FINGERPRINT_LABEL: &[u8] = b"kms key fingerprint";

/// Number of HMAC output bytes kept in the fingerprint.
const FINGERPRINT_LEN: usize = 8;

/// Fixed-size master key buffer.
///
/// The bytes are overwritten with zeroes when the key is dropped. There is no
/// accessor outside this crate and no `Serialize` impl; the only thing that
/// ever leaves is the fingerprint.
pub struct MasterKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
    fingerprint: String,
}

impl MasterKey {
    /// Copy `bytes` into a new master key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyManagerError::InvalidKey`] unless `bytes` is exactly
    /// [`KEY_LEN`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyManagerError> {
        let invalid = || KeyManagerError::InvalidKey {
            expected: KEY_LEN,
            actual: bytes.len(),
        };
        if bytes.len() != KEY_LEN {
            return Err(invalid());
        }

        let mut buf = Zeroizing::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);

        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&buf[..]).map_err(|_| invalid())?;
        mac.update(FINGERPRINT_LABEL);
        let digest = mac.finalize().into_bytes();
        let fingerprint = hex::encode(&digest[..FINGERPRINT_LEN]);

        Ok(Self {
            bytes: buf,
            fingerprint,
        })
    }

    /// Raw key bytes, for building a cipher instance.
    pub(crate) fn expose(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Hex fingerprint identifying this key without revealing it.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}
