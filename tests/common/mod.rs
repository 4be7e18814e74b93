//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use herald::config::manager::ConfigManager;
use herald::config::model::Config;
use herald::config::ConfigVersion;
use herald::provider::registry::Registry;
use herald::provider::{
    Configurable, EmailMessage, EmailProvider, LoadError, ProviderConfig, SendError, SmsMessage,
    SmsProvider,
};
use herald::server::{self, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Provider that records every message it is asked to send.
pub struct Recorder {
    behavior: Behavior,
    pub sent: Mutex<Vec<String>>,
    pub loaded: Mutex<Option<ProviderConfig>>,
}

impl Recorder {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            sent: Mutex::new(Vec::new()),
            loaded: Mutex::new(None),
        })
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, entry: String) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(entry);
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(SendError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "upstream refused connection",
            ))),
            Behavior::Panic => panic!("recorder told to panic"),
        }
    }
}

impl Configurable for Recorder {
    fn load(&self, config: &ProviderConfig) -> Result<(), LoadError> {
        if config.contains_key("broken") {
            return Err(LoadError::MissingField("host"));
        }
        *self.loaded.lock().unwrap() = Some(config.clone());
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for Recorder {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), SendError> {
        let mut entry = format!("{}|{}", message.to.join(","), message.subject);
        for name in message.attachments.keys() {
            entry.push('|');
            entry.push_str(name);
        }
        self.record(entry)
    }
}

#[async_trait]
impl SmsProvider for Recorder {
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), SendError> {
        self.record(format!("{}|{}", message.phone, message.content))
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Start the full router on an ephemeral port with `config` applied.
pub async fn start(registry: Registry, admin_key: Option<&str>, config: Option<Config>) -> TestServer {
    start_with_limit(registry, admin_key, config, 64 * 1024).await
}

/// Like [`start`], with an explicit request body limit.
pub async fn start_with_limit(
    registry: Registry,
    admin_key: Option<&str>,
    config: Option<Config>,
    max_body: usize,
) -> TestServer {
    let manager = ConfigManager::new(Arc::new(registry), admin_key.map(String::from));
    if let Some(config) = config {
        manager
            .apply(config, "test", ConfigVersion::Hash("test-hash-0001".into()))
            .await
            .unwrap();
    }
    let state = Arc::new(AppState::new(manager));

    let router = server::build_router(Arc::clone(&state), max_body);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    TestServer {
        addr,
        state,
        shutdown: Some(shutdown_tx),
    }
}

/// Document enabling `names` as email providers and `sms` as SMS providers,
/// each with empty settings.
pub fn document(emails: &[&str], smses: &[&str]) -> Config {
    let mut config = Config::default();
    for name in emails {
        config.emails.insert((*name).into(), ProviderConfig::new());
    }
    for name in smses {
        config.smses.insert((*name).into(), ProviderConfig::new());
    }
    config
}
