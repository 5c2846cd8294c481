//! Axum router construction.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// Layers run outermost-first: request id, tracing, CORS, origin guard,
/// timeout, body limit.
pub fn build(state: AppState, cors_origin: HeaderValue, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/encrypt", post(handlers::encrypt))
        .route("/decrypt", post(handlers::decrypt))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(axum::middleware::from_fn_with_state(
            cors_origin.clone(),
            middleware::reject_foreign_origin,
        ))
        .layer(middleware::cors(cors_origin))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(middleware::request_span))
        .layer(SetRequestIdLayer::x_request_id(middleware::RequestUuid))
        .with_state(state)
}
