//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{
        DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse, ErrorResponse,
        HealthResponse,
    },
    ServiceError,
};
use tracing::{debug, error, warn};

use super::state::AppState;
use crate::crypto::KeyManagerError;

/// `POST /encrypt` — seal the base64 `payload` under the master key.
///
/// Responds with the base64 envelope `nonce || ciphertext || tag`.
pub async fn encrypt(
    State(state): State<AppState>,
    body: Result<Json<EncryptRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(rejection),
    };

    match state.key_manager.encrypt(&req.payload) {
        Ok(envelope) => {
            debug!(
                plaintext_len = req.payload.len(),
                envelope_len = envelope.len(),
                "payload encrypted"
            );
            (StatusCode::OK, Json(EncryptResponse { payload: envelope })).into_response()
        }
        Err(e) => {
            error!(error = %e, kind = e.kind(), "encryption failed");
            error_response(&ServiceError::EncryptionFailure("encryption failed".into()))
        }
    }
}

/// `POST /decrypt` — open the base64 envelope in `payload`.
///
/// Malformed and unauthenticated envelopes both yield `400` with the same
/// message unless `distinguish_decrypt_errors` is configured.
pub async fn decrypt(
    State(state): State<AppState>,
    body: Result<Json<DecryptRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(rejection),
    };

    match state.key_manager.decrypt(&req.payload) {
        Ok(plaintext) => {
            debug!(envelope_len = req.payload.len(), "payload decrypted");
            (StatusCode::OK, Json(DecryptResponse { payload: plaintext })).into_response()
        }
        Err(e) => {
            warn!(kind = e.kind(), envelope_len = req.payload.len(), "decryption rejected");
            error_response(&decrypt_error(&e, state.distinguish_decrypt_errors))
        }
    }
}

/// `GET /health` — liveness check.
///
/// A running server always has its key loaded, so this is always `200 OK`.
pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        key_fingerprint: state.key_manager.fingerprint().to_owned(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> Response {
    error_response(&ServiceError::NotFound(
        "the requested resource does not exist".into(),
    ))
}

/// Render a [`ServiceError`] as a JSON [`ErrorResponse`] with its status code.
pub fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(err))).into_response()
}

/// Map a decrypt failure onto the error returned to the caller.
fn decrypt_error(err: &KeyManagerError, distinguish: bool) -> ServiceError {
    match err {
        KeyManagerError::MalformedCiphertext | KeyManagerError::Authentication if !distinguish => {
            ServiceError::BadRequest("invalid ciphertext".into())
        }
        KeyManagerError::MalformedCiphertext => {
            ServiceError::BadRequest("malformed ciphertext".into())
        }
        KeyManagerError::Authentication => {
            ServiceError::BadRequest("ciphertext authentication failed".into())
        }
        _ => ServiceError::Internal("decryption failed".into()),
    }
}

/// Turn a body extraction failure into `400`, or `413` for oversize bodies.
///
/// The rejection text is logged but never echoed.
fn rejection_response(rejection: JsonRejection) -> Response {
    debug!(reason = %rejection.body_text(), "request body rejected");
    let err = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge("request body exceeds the configured limit".into())
    } else {
        ServiceError::BadRequest(
            "request body must be JSON of the form {\"payload\": \"<base64>\"}".into(),
        )
    };
    error_response(&err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{key::KEY_LEN, KeyManager};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    fn test_state(distinguish: bool) -> AppState {
        AppState::new(
            KeyManager::from_key_bytes(&[0x42u8; KEY_LEN]).unwrap(),
            distinguish,
        )
    }

    fn test_router(distinguish: bool) -> Router {
        Router::new()
            .route("/encrypt", post(encrypt))
            .route("/decrypt", post(decrypt))
            .route("/health", get(health))
            .with_state(test_state(distinguish))
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn error_body(resp: Response) -> ErrorResponse {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_fingerprint() {
        let state = test_state(false);
        let expected = state.key_manager.fingerprint().to_owned();
        let resp = test_router(false)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.key_fingerprint, expected);
    }

    #[tokio::test]
    async fn invalid_json_is_400() {
        let resp = test_router(false)
            .oneshot(json_post("/encrypt", "{not json"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(resp).await.code, "bad_request");
    }

    #[tokio::test]
    async fn invalid_base64_is_400() {
        let resp = test_router(false)
            .oneshot(json_post("/decrypt", r#"{"payload": "%%%"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_400() {
        let req = Request::builder()
            .method("POST")
            .uri("/encrypt")
            .body(Body::from(r#"{"payload": "aGVsbG8="}"#))
            .unwrap();
        let resp = test_router(false).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn decrypt_errors_share_a_message_by_default() {
        let short = test_router(false)
            .oneshot(json_post("/decrypt", r#"{"payload": "AA=="}"#))
            .await
            .unwrap();
        assert_eq!(short.status(), StatusCode::BAD_REQUEST);
        let short = error_body(short).await;

        // 28 zero bytes: long enough to parse, fails authentication.
        let forged = format!(r#"{{"payload": "{}"}}"#, "A".repeat(36) + "AA==");
        let forged = test_router(false)
            .oneshot(json_post("/decrypt", &forged))
            .await
            .unwrap();
        assert_eq!(forged.status(), StatusCode::BAD_REQUEST);
        let forged = error_body(forged).await;

        assert_eq!(short.message, "invalid ciphertext");
        assert_eq!(short.message, forged.message);
    }

    #[tokio::test]
    async fn decrypt_errors_can_be_distinguished() {
        let resp = test_router(true)
            .oneshot(json_post("/decrypt", r#"{"payload": "AA=="}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(resp).await.message, "malformed ciphertext");
    }

    #[test]
    fn decrypt_error_mapping() {
        let e = decrypt_error(&KeyManagerError::Authentication, false);
        assert_eq!(e.http_status(), 400);
        assert_eq!(e.message(), "invalid ciphertext");

        let e = decrypt_error(&KeyManagerError::Authentication, true);
        assert_eq!(e.message(), "ciphertext authentication failed");

        let e = decrypt_error(&KeyManagerError::Encryption("boom"), false);
        assert_eq!(e.http_status(), 500);
        assert!(!e.message().contains("boom"));
    }
}
