//! Scripted provider used by unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    Configurable, EmailMessage, EmailProvider, LoadError, ProviderConfig, SendError, SmsMessage,
    SmsProvider,
};

pub type Journal = Arc<Mutex<Vec<String>>>;

/// Fails `load` when the config contains a `fail` key; fails every send
/// when built `failing`, with an error naming the attempt number.
pub struct Scripted {
    name: &'static str,
    failing: bool,
    delay: Option<Duration>,
    attempts: AtomicU32,
    journal: Journal,
    pub loaded: Mutex<Option<ProviderConfig>>,
}

impl Scripted {
    pub fn ok(name: &'static str, journal: &Journal) -> Arc<Self> {
        Self::build(name, false, None, journal)
    }

    pub fn failing(name: &'static str, journal: &Journal) -> Arc<Self> {
        Self::build(name, true, None, journal)
    }

    pub fn slow(name: &'static str, delay: Duration, journal: &Journal) -> Arc<Self> {
        Self::build(name, false, Some(delay), journal)
    }

    fn build(
        name: &'static str,
        failing: bool,
        delay: Option<Duration>,
        journal: &Journal,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            failing,
            delay,
            attempts: AtomicU32::new(0),
            journal: journal.clone(),
            loaded: Mutex::new(None),
        })
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    async fn attempt(&self) -> Result<(), SendError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.lock().unwrap().push(self.name.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            Err(SendError::InvalidMessage(format!("{} attempt {n}", self.name)))
        } else {
            Ok(())
        }
    }
}

impl Configurable for Scripted {
    fn load(&self, config: &ProviderConfig) -> Result<(), LoadError> {
        if config.contains_key("fail") {
            return Err(LoadError::InvalidField {
                field: "fail",
                message: "scripted failure".into(),
            });
        }
        *self.loaded.lock().unwrap() = Some(config.clone());
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for Scripted {
    async fn send_email(&self, _message: &EmailMessage) -> Result<(), SendError> {
        self.attempt().await
    }
}

#[async_trait]
impl SmsProvider for Scripted {
    async fn send_sms(&self, _message: &SmsMessage) -> Result<(), SendError> {
        self.attempt().await
    }
}
