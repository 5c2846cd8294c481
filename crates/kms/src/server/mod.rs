//! Axum HTTP server, routing, middleware, and graceful shutdown.
//!
//! # Responsibilities
//! - Define the Axum router mapping `/encrypt` and `/decrypt` onto the
//!   [`KeyManager`](crate::crypto::KeyManager).
//! - Enforce the configured CORS origin.
//! - Translate key manager errors into caller-safe HTTP responses.
//! - Run the listener as a cancellable task with a bounded drain period.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod shutdown;
pub mod state;
