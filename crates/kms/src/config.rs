//! Configuration loading and validation for the KMS service.
//!
//! Values are read from environment variables at startup and may be overridden
//! by command-line flags. The result is a single immutable [`Config`] passed
//! explicitly to the key loader and the router. The process exits with a clear
//! error message if any value is missing or invalid.

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use serde::Deserialize;

/// Command-line flags. Each one overrides the environment variable of the
/// same meaning.
#[derive(Debug, Default, Parser)]
#[command(name = "kms", version, about = "Key management service")]
pub struct Cli {
    /// The port the server binds to (env: `PORT`).
    #[arg(long)]
    pub port: Option<u16>,

    /// The log level (env: `LOG_LEVEL`).
    #[arg(long = "level")]
    pub log_level: Option<String>,

    /// The allowed CORS origin (env: `CORS_ORIGIN`).
    #[arg(long)]
    pub origin: Option<String>,

    /// Where to load the master key from: `file` or `secrets-manager` (env: `KEY_SOURCE`).
    #[arg(long)]
    pub key_source: Option<String>,

    /// Path to the master key file (env: `KEY_FILE`).
    #[arg(long)]
    pub key_file: Option<String>,
}

/// Backend holding the master key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeySourceKind {
    File,
    SecretsManager,
}

/// Encoding of a key file's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEncoding {
    /// Exactly the key bytes.
    Raw,
    /// Standard base64 text.
    Base64,
}

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (`trace`, `debug`, `info`, `warn`, `error`; `warning`,
    /// `fatal` and `panic` are accepted as aliases).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// The single origin allowed to make cross-origin requests.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Backend holding the master key.
    #[serde(default = "default_key_source")]
    pub key_source: KeySourceKind,

    /// Path to the master key file. **Required** when `key_source` is `file`.
    #[serde(default)]
    pub key_file: Option<String>,

    /// Encoding of the key file.
    #[serde(default = "default_key_file_encoding")]
    pub key_file_encoding: KeyEncoding,

    /// Secrets Manager secret id or ARN. **Required** when `key_source` is
    /// `secrets-manager`.
    #[serde(default)]
    pub key_secret_id: Option<String>,

    /// Seconds in-flight requests get to finish after a termination signal.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Report malformed and unauthenticated ciphertexts with different
    /// messages. Off by default so callers cannot tell the two apart.
    #[serde(default)]
    pub distinguish_decrypt_errors: bool,

    /// OTLP endpoint for span export. Export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}
fn default_cors_origin() -> String {
    "http://localhost:9977".into()
}
fn default_key_source() -> KeySourceKind {
    KeySourceKind::File
}
fn default_key_file_encoding() -> KeyEncoding {
    KeyEncoding::Raw
}
fn default_shutdown_grace() -> u64 {
    5
}
fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Config {
    /// Load configuration from environment variables, apply `cli` overrides,
    /// and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .set_override_option("port", cli.port.map(|p| p.to_string()))?
            .set_override_option("log_level", cli.log_level.clone())?
            .set_override_option("cors_origin", cli.origin.clone())?
            .set_override_option("key_source", cli.key_source.clone())?
            .set_override_option("key_file", cli.key_file.clone())?
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The `tracing` filter directive for [`Config::log_level`].
    ///
    /// # Errors
    ///
    /// Returns an error if the level is not recognised.
    pub fn log_directive(&self) -> Result<&'static str> {
        parse_log_level(&self.log_level)
            .with_context(|| format!("unable to parse log level {:?}", self.log_level))
    }

    /// The allowed origin as a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not a valid header value.
    pub fn cors_origin_header(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(self.cors_origin.trim())
            .with_context(|| format!("CORS_ORIGIN {:?} is not a valid header value", self.cors_origin))
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        self.log_directive()?;

        let origin = self.cors_origin.trim();
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            anyhow::bail!("CORS_ORIGIN must be an http(s) origin, got {origin:?}");
        }
        self.cors_origin_header()?;

        match self.key_source {
            KeySourceKind::File => ensure_present(self.key_file.as_deref(), "KEY_FILE")?,
            KeySourceKind::SecretsManager => {
                ensure_present(self.key_secret_id.as_deref(), "KEY_SECRET_ID")?
            }
        }

        if self.shutdown_grace_secs == 0 {
            anyhow::bail!("SHUTDOWN_GRACE_SECS must be > 0");
        }
        if self.max_body_bytes == 0 {
            anyhow::bail!("MAX_BODY_BYTES must be > 0");
        }
        Ok(())
    }
}

/// Map a log level name onto a `tracing` level directive.
fn parse_log_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "fatal" | "panic" => Some("error"),
        _ => None,
    }
}

fn ensure_present(value: Option<&str>, name: &str) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => anyhow::bail!("{name} is required and must not be empty"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            port: default_port(),
            log_level: default_log_level(),
            cors_origin: default_cors_origin(),
            key_source: default_key_source(),
            key_file: Some("/run/secrets/kms.key".into()),
            key_file_encoding: default_key_file_encoding(),
            key_secret_id: None,
            shutdown_grace_secs: default_shutdown_grace(),
            max_body_bytes: default_max_body_bytes(),
            distinguish_decrypt_errors: false,
            otel_exporter_otlp_endpoint: None,
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_port(), 8080);
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_cors_origin(), "http://localhost:9977");
        assert_eq!(default_key_source(), KeySourceKind::File);
        assert_eq!(default_key_file_encoding(), KeyEncoding::Raw);
        assert_eq!(default_shutdown_grace(), 5);
        assert_eq!(default_max_body_bytes(), 65536);
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn log_level_aliases() {
        assert_eq!(parse_log_level("INFO"), Some("info"));
        assert_eq!(parse_log_level("warning"), Some("warn"));
        assert_eq!(parse_log_level("fatal"), Some("error"));
        assert_eq!(parse_log_level("panic"), Some("error"));
        assert_eq!(parse_log_level("verbose"), None);
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let cfg = Config {
            log_level: "loud".into(),
            ..valid_config()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn validate_rejects_non_http_origin() {
        let cfg = Config {
            cors_origin: "localhost:9977".into(),
            ..valid_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_requires_key_file_for_file_source() {
        let cfg = Config {
            key_file: None,
            ..valid_config()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            key_file: Some("  ".into()),
            ..valid_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_requires_secret_id_for_secrets_manager() {
        let cfg = Config {
            key_source: KeySourceKind::SecretsManager,
            key_file: None,
            ..valid_config()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            key_source: KeySourceKind::SecretsManager,
            key_file: None,
            key_secret_id: Some("arn:aws:secretsmanager:eu-west-1:123456789012:secret:kms".into()),
            ..valid_config()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_grace_period() {
        let cfg = Config {
            shutdown_grace_secs: 0,
            ..valid_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_body_limit() {
        let cfg = Config {
            max_body_bytes: 0,
            ..valid_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::parse_from([
            "kms",
            "--port",
            "9000",
            "--level",
            "debug",
            "--origin",
            "https://app.example.com",
            "--key-file",
            "/tmp/key",
        ]);
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.origin.as_deref(), Some("https://app.example.com"));
        assert_eq!(cli.key_file.as_deref(), Some("/tmp/key"));
        assert!(cli.key_source.is_none());
    }
}
