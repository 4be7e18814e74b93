//! `log` provider: writes messages to the tracing output instead of
//! delivering them. Registered for both email and SMS.
//!
//! Accepts one optional config key, `level` (`debug`, `info` or `warn`,
//! default `info`).

use std::sync::RwLock;

use async_trait::async_trait;

use super::{
    Configurable, EmailMessage, EmailProvider, LoadError, ProviderConfig, SendError, SmsMessage,
    SmsProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    fn parse(value: &str) -> Result<Self, LoadError> {
        match value.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            other => Err(LoadError::InvalidField {
                field: "level",
                message: format!("'{other}' is not one of debug, info, warn"),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct LogProvider {
    level: RwLock<Option<LogLevel>>,
}

impl LogProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn level(&self) -> Option<LogLevel> {
        match self.level.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl Configurable for LogProvider {
    fn load(&self, config: &ProviderConfig) -> Result<(), LoadError> {
        let level = config
            .get("level")
            .map_or(Ok(LogLevel::Info), |v| LogLevel::parse(v))?;

        match self.level.write() {
            Ok(mut guard) => *guard = Some(level),
            Err(poisoned) => *poisoned.into_inner() = Some(level),
        }
        Ok(())
    }
}

macro_rules! emit {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
            LogLevel::Warn => tracing::warn!($($arg)+),
        }
    };
}

#[async_trait]
impl EmailProvider for LogProvider {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), SendError> {
        let level = self.level().ok_or(SendError::NotLoaded)?;
        let attachments: Vec<&str> = message.attachments.keys().map(String::as_str).collect();
        emit!(
            level,
            to = %message.to.join(","),
            subject = %message.subject,
            content_len = message.content.len(),
            attachments = ?attachments,
            "email"
        );
        Ok(())
    }
}

#[async_trait]
impl SmsProvider for LogProvider {
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), SendError> {
        let level = self.level().ok_or(SendError::NotLoaded)?;
        emit!(
            level,
            phone = %message.phone,
            content = %message.content,
            "sms"
        );
        Ok(())
    }
}
