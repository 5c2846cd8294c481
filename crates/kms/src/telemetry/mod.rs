//! Structured logging, with optional span export over OTLP.
//!
//! # Telemetry invariants
//!
//! - **No payloads or key material** may appear in any span attribute or log
//!   field. Handlers log payload lengths and error kinds only.
//! - Log level is configurable via `LOG_LEVEL` / `--level` (default: `info`);
//!   `RUST_LOG`, when set, takes precedence.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
