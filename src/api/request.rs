//! Inbound request bodies and their validation.
//!
//! The same structs deserialize from a JSON body (`POST`) and from the
//! query string (`GET`, when the active configuration allows it).
//! Validation turns them into canonical [`Request`]s before anything is
//! handed to the dispatcher.

use std::collections::BTreeMap;

use axum::extract::Query;
use axum::http::{Method, Uri};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::manager::Snapshot;
use crate::dispatch::{Request, Selector};
use crate::error::HeraldError;
use crate::provider::{EmailMessage, SmsMessage};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailBody {
    pub provider: String,
    pub subject: String,
    pub content: String,
    /// Comma-separated recipient list.
    pub to: String,
    pub attachments: BTreeMap<String, String>,
    pub retry: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SmsBody {
    pub provider: String,
    pub phone: String,
    pub content: String,
    pub retry: u32,
}

/// Decode a send request according to the method and the active
/// configuration: JSON for `POST`, query string for `GET` when
/// `allow_get` is set, and [`HeraldError::MethodNotAllowed`] otherwise.
pub fn decode<T: DeserializeOwned>(
    snapshot: &Snapshot,
    method: &Method,
    uri: &Uri,
    body: &Bytes,
) -> Result<T, HeraldError> {
    if method == Method::POST {
        serde_json::from_slice(body)
            .map_err(|e| HeraldError::InvalidRequest(format!("malformed JSON body: {e}")))
    } else if method == Method::GET && snapshot.allow_get {
        Query::<T>::try_from_uri(uri)
            .map(|Query(query)| query)
            .map_err(|e| HeraldError::InvalidRequest(e.body_text()))
    } else {
        Err(HeraldError::MethodNotAllowed)
    }
}

/// Largest retry budget a single request may ask for.
pub const MAX_RETRY: u32 = 10;

fn check_retry(retry: u32) -> Result<u32, HeraldError> {
    if retry > MAX_RETRY {
        return Err(HeraldError::InvalidRequest(format!(
            "'retry' must be at most {MAX_RETRY}, got {retry}"
        )));
    }
    Ok(retry)
}

fn require(field: &str, value: &str) -> Result<(), HeraldError> {
    if value.trim().is_empty() {
        return Err(HeraldError::InvalidRequest(format!("'{field}' is required")));
    }
    Ok(())
}

impl EmailBody {
    pub fn into_request(self) -> Result<Request<EmailMessage>, HeraldError> {
        require("subject", &self.subject)?;
        let retry = check_retry(self.retry)?;
        let to: Vec<String> = self
            .to
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(String::from)
            .collect();
        if to.is_empty() {
            return Err(HeraldError::InvalidRequest("'to' is required".into()));
        }

        let attachments = self
            .attachments
            .into_iter()
            .map(|(name, content)| (name, Bytes::from(content)))
            .collect();

        Ok(Request {
            selector: Selector::parse(&self.provider),
            message: EmailMessage {
                to,
                subject: self.subject,
                content: self.content,
                attachments,
            },
            retry,
        })
    }
}

impl SmsBody {
    pub fn into_request(self) -> Result<Request<SmsMessage>, HeraldError> {
        require("phone", &self.phone)?;
        let retry = check_retry(self.retry)?;
        Ok(Request {
            selector: Selector::parse(&self.provider),
            message: SmsMessage {
                phone: self.phone.trim().to_string(),
                content: self.content,
            },
            retry,
        })
    }
}
