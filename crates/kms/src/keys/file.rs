//! [`FileKeySource`]: reads the master key from a local file.

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::{decode_base64_key, BoxError, KeyLoadError, KeySource};
use crate::config::KeyEncoding;

/// Reads the master key from a file on every [`KeySource::fetch_key`] call.
///
/// With [`KeyEncoding::Raw`] the file must contain exactly the key bytes. With
/// [`KeyEncoding::Base64`] it holds standard base64 text; surrounding
/// whitespace (such as a trailing newline) is ignored.
#[derive(Debug, Clone)]
pub struct FileKeySource {
    path: PathBuf,
    encoding: KeyEncoding,
}

impl FileKeySource {
    pub fn new(path: impl AsRef<Path>, encoding: KeyEncoding) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            encoding,
        }
    }
}

impl KeySource for FileKeySource {
    async fn fetch_key(&self) -> Result<Zeroizing<Vec<u8>>, BoxError> {
        let location = self.path.display().to_string();
        let contents = Zeroizing::new(tokio::fs::read(&self.path).await.map_err(|source| {
            KeyLoadError::ReadFile {
                path: location.clone(),
                source,
            }
        })?);

        match self.encoding {
            KeyEncoding::Raw => Ok(contents),
            KeyEncoding::Base64 => Ok(decode_base64_key(&contents, &location)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{key::KEY_LEN, KeyManager, KeyManagerError};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::io::Write;

    fn key_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn reads_raw_key() {
        let file = key_file(&[0x5A; KEY_LEN]);
        let source = FileKeySource::new(file.path(), KeyEncoding::Raw);
        let bytes = source.fetch_key().await.unwrap();
        assert_eq!(&bytes[..], &[0x5A; KEY_LEN]);
    }

    #[tokio::test]
    async fn reads_base64_key_with_trailing_newline() {
        let text = format!("{}\n", STANDARD.encode([0x33; KEY_LEN]));
        let file = key_file(text.as_bytes());
        let source = FileKeySource::new(file.path(), KeyEncoding::Base64);
        let bytes = source.fetch_key().await.unwrap();
        assert_eq!(&bytes[..], &[0x33; KEY_LEN]);
    }

    #[tokio::test]
    async fn missing_file_is_a_key_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileKeySource::new(dir.path().join("absent.key"), KeyEncoding::Raw);
        let err = KeyManager::load(&source).await.unwrap_err();
        assert!(matches!(err, KeyManagerError::KeySource(_)));
    }

    #[tokio::test]
    async fn garbage_base64_is_a_key_source_error() {
        let file = key_file(b"definitely not base64!");
        let source = FileKeySource::new(file.path(), KeyEncoding::Base64);
        let err = KeyManager::load(&source).await.unwrap_err();
        assert!(matches!(err, KeyManagerError::KeySource(_)));
    }

    #[tokio::test]
    async fn raw_key_with_newline_is_invalid() {
        let mut contents = vec![0x01; KEY_LEN];
        contents.push(b'\n');
        let file = key_file(&contents);
        let source = FileKeySource::new(file.path(), KeyEncoding::Raw);
        let err = KeyManager::load(&source).await.unwrap_err();
        assert!(matches!(
            err,
            KeyManagerError::InvalidKey {
                expected: KEY_LEN,
                actual
            } if actual == KEY_LEN + 1
        ));
    }

    #[tokio::test]
    async fn empty_file_is_invalid() {
        let file = key_file(b"");
        let source = FileKeySource::new(file.path(), KeyEncoding::Raw);
        assert!(matches!(
            KeyManager::load(&source).await,
            Err(KeyManagerError::InvalidKey { actual: 0, .. })
        ));
    }
}
