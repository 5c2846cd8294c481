//! Axum middleware layers applied to the router.
//!
//! Includes CORS, the origin guard, request ids, request spans, and the
//! per-request timeout.

use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use common::ServiceError;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, RequestId},
};
use tracing::{warn, Span};
use uuid::Uuid;

use super::handlers::error_response;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// CORS policy allowing exactly `origin`.
pub fn cors(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Reject requests whose `Origin` header names a different origin.
///
/// Requests without an `Origin` header (server-to-server callers) pass.
pub async fn reject_foreign_origin(
    State(allowed): State<HeaderValue>,
    req: Request,
    next: Next,
) -> Response {
    match req.headers().get(header::ORIGIN) {
        Some(origin) if *origin != allowed => {
            warn!(origin = ?origin, "rejected request from foreign origin");
            error_response(&ServiceError::Forbidden("origin not allowed".into()))
        }
        _ => next.run(req).await,
    }
}

/// Generates a UUID v4 `x-request-id` for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestUuid;

impl MakeRequestId for RequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Span opened for every request. Records the path only, never the query or
/// body.
pub fn request_span(req: &Request<Body>) -> Span {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %request_id,
    )
}
