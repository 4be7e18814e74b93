//! Send policy: turns a validated request into provider calls.
//!
//! The caller captures one [`Snapshot`] at request start and passes it
//! in; the whole dispatch runs against that snapshot even if the
//! configuration is replaced meanwhile.
//!
//! - A single named provider is retried immediately, without backoff,
//!   up to the request's retry budget (`retry + 1` attempts in total).
//! - The `all` selector tries every enabled provider once, in name
//!   order, and stops at the first success. The retry budget does not
//!   apply to this mode.
//!
//! Every attempt is bounded by the snapshot's send timeout. Failures are
//! logged and recorded in the [`DispatchReport`]; when nothing succeeds
//! the last error is returned.

pub mod resolve;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::manager::Snapshot;
use crate::error::HeraldError;
use crate::provider::{Category, EmailMessage, SendError, SmsMessage};

pub use resolve::{Plan, Selector};

/// One outbound send intent.
#[derive(Debug, Clone)]
pub struct Request<M> {
    pub selector: Selector,
    pub message: M,
    /// Additional attempts allowed after the first failure.
    pub retry: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub provider: String,
    pub attempt: u32,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Provider that accepted the message.
    pub provider: String,
    /// Total send attempts, including the successful one.
    pub attempts: u32,
    pub failures: Vec<AttemptFailure>,
}

pub async fn send_email(
    snapshot: &Snapshot,
    request: &Request<EmailMessage>,
) -> Result<DispatchReport, HeraldError> {
    let plan = resolve::resolve(
        Category::Email,
        &request.selector,
        snapshot.emails(),
        snapshot.default_provider(Category::Email),
    )?;
    let message = &request.message;
    execute(
        Category::Email,
        plan,
        request.retry,
        snapshot.timeout,
        |provider| async move { provider.send_email(message).await },
    )
    .await
}

pub async fn send_sms(
    snapshot: &Snapshot,
    request: &Request<SmsMessage>,
) -> Result<DispatchReport, HeraldError> {
    let plan = resolve::resolve(
        Category::Sms,
        &request.selector,
        snapshot.smses(),
        snapshot.default_provider(Category::Sms),
    )?;
    let message = &request.message;
    execute(
        Category::Sms,
        plan,
        request.retry,
        snapshot.timeout,
        |provider| async move { provider.send_sms(message).await },
    )
    .await
}

#[allow(clippy::cast_possible_truncation)]
async fn execute<P, F, Fut>(
    category: Category,
    plan: Plan<P>,
    retry: u32,
    timeout: Duration,
    send: F,
) -> Result<DispatchReport, HeraldError>
where
    P: ?Sized,
    F: Fn(Arc<P>) -> Fut,
    Fut: Future<Output = Result<(), SendError>>,
{
    let (targets, attempts_per_target) = match plan {
        Plan::Single(name, provider) => (vec![(name, provider)], retry.saturating_add(1)),
        Plan::All(targets) => (targets, 1),
    };

    let mut failures = Vec::new();
    let mut attempts = 0u32;
    let mut last_error = None;

    for (name, provider) in targets {
        for attempt in 1..=attempts_per_target {
            attempts += 1;
            let start = Instant::now();
            let result = match tokio::time::timeout(timeout, send(Arc::clone(&provider))).await {
                Ok(result) => result,
                Err(_) => Err(SendError::TimedOut(timeout)),
            };
            let latency_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    tracing::info!(
                        %category,
                        provider = %name,
                        attempt,
                        latency_ms,
                        "message sent"
                    );
                    return Ok(DispatchReport {
                        provider: name,
                        attempts,
                        failures,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        %category,
                        provider = %name,
                        attempt,
                        latency_ms,
                        error = %e,
                        "send attempt failed"
                    );
                    failures.push(AttemptFailure {
                        provider: name.clone(),
                        attempt,
                        error: e.to_string(),
                    });
                    last_error = Some((name.clone(), e));
                }
            }
        }
    }

    // Plans are never empty, so at least one attempt recorded an error.
    let (provider, source) = last_error.unwrap_or_else(|| {
        (
            String::new(),
            SendError::InvalidMessage("no provider attempted".into()),
        )
    });
    Err(HeraldError::Send {
        category,
        provider,
        attempts,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::manager::ConfigManager;
    use crate::config::model::Config;
    use crate::config::ConfigVersion;
    use crate::provider::registry::Registry;
    use crate::provider::testing::{Journal, Scripted};
    use crate::provider::ProviderConfig;

    async fn snapshot_with(
        registry: Registry,
        emails: &[&str],
        smses: &[&str],
        tweak: impl FnOnce(&mut Config),
    ) -> Arc<Snapshot> {
        let manager = ConfigManager::new(Arc::new(registry), None);
        let mut doc = Config::default();
        for name in emails {
            doc.emails.insert((*name).into(), ProviderConfig::new());
        }
        for name in smses {
            doc.smses.insert((*name).into(), ProviderConfig::new());
        }
        tweak(&mut doc);
        manager
            .apply(doc, "test", ConfigVersion::Hash("t".into()))
            .await
            .unwrap()
    }

    fn email(selector: &str, retry: u32) -> Request<EmailMessage> {
        Request {
            selector: Selector::parse(selector),
            message: EmailMessage {
                to: vec!["ops@example.com".into()],
                subject: "hello".into(),
                ..EmailMessage::default()
            },
            retry,
        }
    }

    fn sms(selector: &str, retry: u32) -> Request<SmsMessage> {
        Request {
            selector: Selector::parse(selector),
            message: SmsMessage {
                phone: "+15550100".into(),
                content: "hi".into(),
            },
            retry,
        }
    }

    #[tokio::test]
    async fn all_stops_at_first_success_and_records_one_failure() {
        let journal = Journal::default();
        let p1 = Scripted::failing("p1", &journal);
        let p2 = Scripted::ok("p2", &journal);
        let p3 = Scripted::ok("p3", &journal);
        let mut registry = Registry::new();
        registry.register_email("p1", p1.clone()).unwrap();
        registry.register_email("p2", p2.clone()).unwrap();
        registry.register_email("p3", p3.clone()).unwrap();
        let snapshot = snapshot_with(registry, &["p3", "p2", "p1"], &[], |_| {}).await;

        let report = send_email(&snapshot, &email("all", 5)).await.unwrap();

        assert_eq!(report.provider, "p2");
        assert_eq!(report.attempts, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].provider, "p1");
        assert_eq!(*journal.lock().unwrap(), vec!["p1", "p2"]);
        assert_eq!(p3.attempts(), 0);
    }

    #[tokio::test]
    async fn all_failing_returns_last_error() {
        let journal = Journal::default();
        let mut registry = Registry::new();
        registry.register_sms("a", Scripted::failing("a", &journal)).unwrap();
        registry.register_sms("b", Scripted::failing("b", &journal)).unwrap();
        let snapshot = snapshot_with(registry, &[], &["b", "a"], |_| {}).await;

        let err = send_sms(&snapshot, &sms("all", 3)).await.unwrap_err();

        match err {
            HeraldError::Send {
                provider,
                attempts,
                source,
                ..
            } => {
                assert_eq!(provider, "b");
                assert_eq!(attempts, 2);
                assert_eq!(source.to_string(), "invalid message: b attempt 1");
            }
            other => panic!("expected send error, got {other:?}"),
        }
        assert_eq!(*journal.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn retry_budget_gives_n_plus_one_attempts() {
        let journal = Journal::default();
        let flaky = Scripted::failing("flaky", &journal);
        let mut registry = Registry::new();
        registry.register_sms("flaky", flaky.clone()).unwrap();
        let snapshot = snapshot_with(registry, &[], &["flaky"], |_| {}).await;

        let err = send_sms(&snapshot, &sms("flaky", 2)).await.unwrap_err();

        assert_eq!(flaky.attempts(), 3);
        match err {
            HeraldError::Send {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.to_string(), "invalid message: flaky attempt 3");
            }
            other => panic!("expected send error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_on_first_attempt_skips_retries() {
        let journal = Journal::default();
        let good = Scripted::ok("good", &journal);
        let mut registry = Registry::new();
        registry.register_email("good", good.clone()).unwrap();
        let snapshot = snapshot_with(registry, &["good"], &[], |_| {}).await;

        let report = send_email(&snapshot, &email("good", 4)).await.unwrap();
        assert_eq!(report.attempts, 1);
        assert!(report.failures.is_empty());
        assert_eq!(good.attempts(), 1);
    }

    #[tokio::test]
    async fn empty_selector_uses_configured_default() {
        let journal = Journal::default();
        let mut registry = Registry::new();
        registry.register_email("plain", Scripted::ok("plain", &journal)).unwrap();
        registry.register_email("backup", Scripted::ok("backup", &journal)).unwrap();
        registry.register_sms("gw", Scripted::ok("gw", &journal)).unwrap();

        let snapshot = snapshot_with(registry, &["plain", "backup"], &["gw"], |doc| {
            doc.default_email_provider = Some("backup".into());
        })
        .await;
        let report = send_email(&snapshot, &email("", 0)).await.unwrap();
        assert_eq!(report.provider, "backup");

        // SMS has no hardcoded fallback
        let err = send_sms(&snapshot, &sms("", 0)).await.unwrap_err();
        assert!(matches!(err, HeraldError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn email_falls_back_to_plain() {
        let journal = Journal::default();
        let mut registry = Registry::new();
        registry.register_email("plain", Scripted::ok("plain", &journal)).unwrap();
        let snapshot = snapshot_with(registry, &["plain"], &[], |_| {}).await;

        let report = send_email(&snapshot, &email("", 0)).await.unwrap();
        assert_eq!(report.provider, "plain");
    }

    #[tokio::test]
    async fn unknown_provider_is_not_attempted() {
        let journal = Journal::default();
        let mut registry = Registry::new();
        registry.register_email("plain", Scripted::ok("plain", &journal)).unwrap();
        let snapshot = snapshot_with(registry, &["plain"], &[], |_| {}).await;

        let err = send_email(&snapshot, &email("ses", 0)).await.unwrap_err();
        assert!(matches!(err, HeraldError::ProviderNotFound { .. }));
        assert!(journal.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_times_out_and_falls_through() {
        let journal = Journal::default();
        let mut registry = Registry::new();
        registry
            .register_email("a-slow", Scripted::slow("a-slow", Duration::from_secs(60), &journal))
            .unwrap();
        registry.register_email("b-fast", Scripted::ok("b-fast", &journal)).unwrap();
        let snapshot = snapshot_with(registry, &["a-slow", "b-fast"], &[], |doc| {
            doc.timeout = 1_000;
        })
        .await;

        let report = send_email(&snapshot, &email("all", 0)).await.unwrap();
        assert_eq!(report.provider, "b-fast");
        assert_eq!(report.failures[0].error, "send timed out after 1000ms");
    }

    #[tokio::test]
    async fn dispatch_uses_the_captured_snapshot() {
        let journal = Journal::default();
        let registry = {
            let mut r = Registry::new();
            r.register_email("old", Scripted::ok("old", &journal)).unwrap();
            r.register_email("new", Scripted::ok("new", &journal)).unwrap();
            Arc::new(r)
        };
        let manager = ConfigManager::new(registry, None);
        let mut doc = Config::default();
        doc.emails.insert("old".into(), ProviderConfig::new());
        manager
            .apply(doc, "test", ConfigVersion::Hash("1".into()))
            .await
            .unwrap();

        let captured = manager.current().await;

        let mut doc = Config::default();
        doc.emails.insert("new".into(), ProviderConfig::new());
        manager
            .apply(doc, "test", ConfigVersion::Hash("2".into()))
            .await
            .unwrap();

        let report = send_email(&captured, &email("all", 0)).await.unwrap();
        assert_eq!(report.provider, "old");
    }
}
