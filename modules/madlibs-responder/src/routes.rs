use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::dispatch::{DispatchError, DispatchOutcome, Dispatcher};

/// Request header naming where the response event is delivered.
pub const CALLBACK_HEADER: &str = "x-callback-url";

const WEBHOOK_REQUEST_ORIGIN: &str = "webhook-request-origin";
const WEBHOOK_REQUEST_RATE: &str = "webhook-request-rate";
const WEBHOOK_ALLOWED_ORIGIN: &str = "webhook-allowed-origin";
const WEBHOOK_ALLOWED_RATE: &str = "webhook-allowed-rate";

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Binary-mode senders may deliver with GET; the event travels in headers.
        .route(
            "/api/madlibs",
            get(madlibs).post(madlibs).options(validate_webhook),
        )
        .with_state(AppState { dispatcher })
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

async fn madlibs(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let event = match cloudevents_http::decode(&headers, &body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Rejected undecodable event");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let callback = headers
        .get(CALLBACK_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.dispatcher.handle(&event, callback).await {
        Ok(DispatchOutcome::Delivered(delivery)) => StatusCode::from_u16(delivery.status)
            .unwrap_or(StatusCode::BAD_GATEWAY)
            .into_response(),
        Ok(DispatchOutcome::Ignored) => StatusCode::NO_CONTENT.into_response(),
        Err(DispatchError::MissingCallback) => {
            error_response(StatusCode::BAD_REQUEST, "Missing X-Callback-URL header")
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// CloudEvents webhook abuse-protection handshake. Every requesting origin is
/// allowed, at any rate.
async fn validate_webhook(headers: HeaderMap) -> Response {
    let Some(origin) = headers.get(WEBHOOK_REQUEST_ORIGIN).cloned() else {
        return error_response(StatusCode::BAD_REQUEST, "Missing WebHook-Request-Origin header");
    };

    let mut response_headers = HeaderMap::new();
    response_headers.insert(HeaderName::from_static(WEBHOOK_ALLOWED_ORIGIN), origin);
    response_headers.insert(header::ALLOW, HeaderValue::from_static("POST, OPTIONS"));
    if headers.contains_key(WEBHOOK_REQUEST_RATE) {
        response_headers.insert(
            HeaderName::from_static(WEBHOOK_ALLOWED_RATE),
            HeaderValue::from_static("*"),
        );
    }

    (StatusCode::OK, response_headers).into_response()
}
