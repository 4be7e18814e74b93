//! Provider contract shared by every email and SMS backend.
//!
//! A provider is a long-lived, stateful plugin. [`Configurable::load`]
//! installs a fresh configuration (and may be called again whenever the
//! active configuration is replaced); [`EmailProvider::send_email`] and
//! [`SmsProvider::send_sms`] perform the actual transport.
//!
//! Providers are shared across requests behind an `Arc`, so `load` may
//! race with an in-flight send on the same instance. Each implementation
//! guards its own state so a send always observes one complete set of
//! credentials.
//!
//! Submodules provide the [`registry`] of provider kinds and the
//! built-in [`plain`] (SMTP) and [`logger`] providers.

pub mod logger;
pub mod plain;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Raw, per-provider configuration as it appears in the config document.
pub type ProviderConfig = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Email,
    Sms,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{field}': {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("provider has no loaded configuration")]
    NotLoaded,

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("send timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

impl SendError {
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub content: String,
    /// Attachment file name to raw content.
    pub attachments: BTreeMap<String, Bytes>,
}

#[derive(Debug, Clone, Default)]
pub struct SmsMessage {
    pub phone: String,
    pub content: String,
}

pub trait Configurable: Send + Sync {
    /// Replace the provider's configuration.
    ///
    /// A provider whose most recent `load` failed must not be used for
    /// sending until a later `load` succeeds.
    fn load(&self, config: &ProviderConfig) -> Result<(), LoadError>;
}

// async_trait is required here because providers are stored as Arc<dyn ...>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait EmailProvider: Configurable {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), SendError>;
}

#[async_trait]
pub trait SmsProvider: Configurable {
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), SendError>;
}

/// Fetch a configuration value that must be present.
pub fn required<'a>(config: &'a ProviderConfig, field: &'static str) -> Result<&'a str, LoadError> {
    config
        .get(field)
        .map(String::as_str)
        .ok_or(LoadError::MissingField(field))
}
