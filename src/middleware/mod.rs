//! Tower middleware shared by every route.
//!
//! [`correlation_id`] echoes the caller's `x-correlation-id` header (or
//! generates a UUID v4), exposes it to handlers as a [`CorrelationId`]
//! request extension, and stamps it on the response. It sits outside the
//! panic layer, so even a 500 produced by a caught panic carries the id.

use std::any::Any;

use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub async fn correlation_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(CorrelationId(id.clone()));
    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

/// Response for a handler that panicked; used with `CatchPanicLayer::custom`.
#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = %detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}
