//! HTTP handlers for the send and configuration endpoints.
//!
//! Each handler captures the live [`Snapshot`](crate::config::manager::Snapshot)
//! once, runs to completion against it, and maps any [`HeraldError`] to a
//! plain-text response through [`HeraldError::status_code`]. Request
//! decoding and field validation live in [`request`].

pub mod request;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use bytes::Bytes;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::Instrument;

use crate::config::manager::Snapshot;
use crate::config::sources::parse_document;
use crate::dispatch::{self, DispatchReport};
use crate::error::HeraldError;
use crate::middleware::CorrelationId;
use crate::provider::Category;
use crate::server::AppState;

use request::{EmailBody, SmsBody};

/// Source name recorded on snapshots applied through `POST /v1/config`.
pub const API_SOURCE: &str = "api";

pub async fn email_handler(
    State(state): State<Arc<AppState>>,
    Extension(correlation_id): Extension<CorrelationId>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let span = tracing::info_span!("send", %correlation_id, category = "email");
    async move {
        let snapshot = state.config.current().await;
        let result: Result<DispatchReport, HeraldError> = async {
            if snapshot.provider_count(Category::Email) == 0 {
                return Err(HeraldError::NotConfigured(Category::Email));
            }
            let request = request::decode::<EmailBody>(&snapshot, &method, &uri, &body)?
                .into_request()?;
            dispatch::send_email(&snapshot, &request).await
        }
        .await;
        send_response(&state, result)
    }
    .instrument(span)
    .await
}

pub async fn sms_handler(
    State(state): State<Arc<AppState>>,
    Extension(correlation_id): Extension<CorrelationId>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let span = tracing::info_span!("send", %correlation_id, category = "sms");
    async move {
        let snapshot = state.config.current().await;
        let result: Result<DispatchReport, HeraldError> = async {
            if snapshot.provider_count(Category::Sms) == 0 {
                return Err(HeraldError::NotConfigured(Category::Sms));
            }
            let request =
                request::decode::<SmsBody>(&snapshot, &method, &uri, &body)?.into_request()?;
            dispatch::send_sms(&snapshot, &request).await
        }
        .await;
        send_response(&state, result)
    }
    .instrument(span)
    .await
}

/// `GET /v1/config`: the active document with credentials masked.
pub async fn get_config(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.config.current().await;
    Json(snapshot.document.redacted()).into_response()
}

/// `POST /v1/config`: replace the active configuration.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Extension(correlation_id): Extension<CorrelationId>,
    body: Bytes,
) -> Response {
    let span = tracing::info_span!("config_update", %correlation_id);
    async move {
        let result: Result<Arc<Snapshot>, HeraldError> = async {
            let current = state.config.current().await;
            authorize(current.admin_key(), &body)?;
            let (document, version) = parse_document(&body, API_SOURCE)?;
            state.config.apply(document, API_SOURCE, version).await
        }
        .await;

        match result {
            Ok(snapshot) => {
                state.stats.config_reloads.fetch_add(1, Ordering::Relaxed);
                (
                    StatusCode::OK,
                    format!("configuration applied (version {})", snapshot.version.short()),
                )
                    .into_response()
            }
            Err(e) => error_response(&e),
        }
    }
    .instrument(span)
    .await
}

#[derive(Deserialize)]
struct KeyProbe {
    #[serde(default)]
    key: Option<String>,
}

/// Check the document's `key` against the server-held admin key before
/// the rest of the body is parsed.
fn authorize(expected: Option<&str>, body: &[u8]) -> Result<(), HeraldError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let presented = serde_json::from_slice::<KeyProbe>(body)
        .ok()
        .and_then(|probe| probe.key)
        .filter(|key| !key.is_empty())
        .ok_or(HeraldError::Unauthorized)?;

    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(HeraldError::Forbidden)
    }
}

fn send_response(state: &AppState, result: Result<DispatchReport, HeraldError>) -> Response {
    match result {
        Ok(report) => {
            state.stats.sent.fetch_add(1, Ordering::Relaxed);
            Json(report).into_response()
        }
        Err(e) => {
            if matches!(e, HeraldError::Send { .. }) {
                state.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
            error_response(&e)
        }
    }
}

fn error_response(err: &HeraldError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %err, "request failed");
    } else {
        tracing::warn!(status = status.as_u16(), error = %err, "request rejected");
    }
    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_server_accepts_any_key() {
        assert!(authorize(None, b"{}").is_ok());
        assert!(authorize(None, b"not json").is_ok());
    }

    #[test]
    fn missing_key_is_unauthorized() {
        let err = authorize(Some("secret"), br#"{"emails": {}}"#).unwrap_err();
        assert!(matches!(err, HeraldError::Unauthorized));

        let err = authorize(Some("secret"), br#"{"key": ""}"#).unwrap_err();
        assert!(matches!(err, HeraldError::Unauthorized));

        let err = authorize(Some("secret"), b"garbage").unwrap_err();
        assert!(matches!(err, HeraldError::Unauthorized));
    }

    #[test]
    fn key_is_checked_before_document_shape() {
        let err = authorize(Some("secret"), br#"{"key": "nope", "bogus": 1}"#).unwrap_err();
        assert!(matches!(err, HeraldError::Forbidden));

        // A valid key lets an invalid document through to the parser.
        assert!(authorize(Some("secret"), br#"{"key": "secret", "bogus": 1}"#).is_ok());
    }
}
