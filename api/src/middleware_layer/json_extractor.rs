//! Wraps plain-text extractor rejections (bad JSON, bad path or query) in the
//! JSON envelope so the page only ever parses one error shape.

use axum::{
    body::{Body, Bytes, to_bytes},
    http::{HeaderValue, Request, StatusCode, header, response::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::core::http::response_envelope::{ApiResponse, ErrorDetail};

/// Request fields a rejection message may name.
const KNOWN_FIELDS: [&str; 2] = ["question", "persist"];

/// Rejection bodies are short; anything larger is passed through.
const MAX_REJECTION_BYTES: usize = 64 * 1024;

pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();
    if status != StatusCode::BAD_REQUEST && status != StatusCode::UNPROCESSABLE_ENTITY {
        return res;
    }

    let (parts, body) = res.into_parts();
    let bytes = match to_bytes(body, MAX_REJECTION_BYTES).await {
        Ok(b) => b,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };
    if is_envelope(&parts, &bytes) {
        return Response::from_parts(parts, bytes.into());
    }

    let message = String::from_utf8_lossy(&bytes).trim().to_string();
    debug!(%status, %message, "wrapping extractor rejection");

    let detail = ErrorDetail {
        field: KNOWN_FIELDS
            .iter()
            .find(|f| message.contains(*f))
            .map(|f| f.to_string()),
        hint: message
            .contains("missing field")
            .then(|| "Send a JSON object such as {\"question\": \"...\"}.".to_string()),
    };
    let code = if status == StatusCode::BAD_REQUEST {
        "BAD_REQUEST"
    } else {
        "UNPROCESSABLE_ENTITY"
    };

    let mut wrapped = ApiResponse::<()>::error(code, message, vec![detail])
        .with_status(status)
        .into_response();
    // Keep headers such as `allow`; the body and its type are ours now.
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            wrapped.headers_mut().insert(name.clone(), value.clone());
        }
    }
    wrapped.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    wrapped
}

/// Already rendered by `AppError` or a handler.
fn is_envelope(parts: &Parts, bytes: &Bytes) -> bool {
    let json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    json && serde_json::from_slice::<serde_json::Value>(bytes)
        .is_ok_and(|v| v.get("success").is_some())
}
