//! Live configuration: turns a [`Config`] document into an immutable
//! [`Snapshot`] and publishes it.
//!
//! `apply` resolves every configured provider against the [`Registry`],
//! calls `load` on each, and only when all of them succeed swaps the
//! published `Arc<Snapshot>`. When one fails, providers already loaded in
//! that call are reloaded with the settings of the published snapshot. The write lock is held for the pointer swap
//! only; readers clone the `Arc` under a brief read lock and keep using
//! their copy for as long as they need it. Concurrent `apply` calls are
//! serialized so the last writer wins.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use super::model::{Config, FALLBACK_EMAIL_PROVIDER};
use super::validation::validate;
use super::ConfigVersion;
use crate::error::HeraldError;
use crate::provider::registry::Registry;
use crate::provider::{Category, Configurable, EmailProvider, ProviderConfig, SmsProvider};

/// The configuration in effect at one point in time. Never mutated after
/// publication.
pub struct Snapshot {
    pub allow_get: bool,
    pub ignore_not_supported_provider: bool,
    pub timeout: Duration,
    admin_key: Option<String>,
    emails: BTreeMap<String, Arc<dyn EmailProvider>>,
    smses: BTreeMap<String, Arc<dyn SmsProvider>>,
    /// The applied document, admin key stripped.
    pub document: Config,
    pub version: ConfigVersion,
    pub source_name: String,
    pub loaded_at: Instant,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("allow_get", &self.allow_get)
            .field("emails", &self.emails.keys().collect::<Vec<_>>())
            .field("smses", &self.smses.keys().collect::<Vec<_>>())
            .field("version", &self.version)
            .field("source_name", &self.source_name)
            .finish_non_exhaustive()
    }
}

impl Snapshot {
    fn empty(admin_key: Option<String>) -> Self {
        let document = Config::default();
        Self {
            allow_get: document.allow_get,
            ignore_not_supported_provider: document.ignore_not_supported_provider,
            timeout: Duration::from_millis(document.timeout),
            admin_key,
            emails: BTreeMap::new(),
            smses: BTreeMap::new(),
            document,
            version: ConfigVersion::Empty,
            source_name: "none".into(),
            loaded_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn admin_key(&self) -> Option<&str> {
        self.admin_key.as_deref()
    }

    #[must_use]
    pub fn email(&self, name: &str) -> Option<Arc<dyn EmailProvider>> {
        self.emails.get(name).cloned()
    }

    #[must_use]
    pub fn sms(&self, name: &str) -> Option<Arc<dyn SmsProvider>> {
        self.smses.get(name).cloned()
    }

    /// Enabled email providers in name order.
    #[must_use]
    pub const fn emails(&self) -> &BTreeMap<String, Arc<dyn EmailProvider>> {
        &self.emails
    }

    /// Enabled SMS providers in name order.
    #[must_use]
    pub const fn smses(&self) -> &BTreeMap<String, Arc<dyn SmsProvider>> {
        &self.smses
    }

    #[must_use]
    pub fn provider_count(&self, category: Category) -> usize {
        match category {
            Category::Email => self.emails.len(),
            Category::Sms => self.smses.len(),
        }
    }

    /// Provider used when a request leaves the selector empty: the
    /// configured default, else `plain` for email. SMS has no fallback.
    #[must_use]
    pub fn default_provider(&self, category: Category) -> Option<&str> {
        self.document
            .default_provider(category)
            .or(match category {
                Category::Email => Some(FALLBACK_EMAIL_PROVIDER),
                Category::Sms => None,
            })
    }
}

pub struct ConfigManager {
    registry: Arc<Registry>,
    admin_key: Option<String>,
    current: RwLock<Arc<Snapshot>>,
    apply_lock: Mutex<()>,
}

impl ConfigManager {
    /// Start with an empty snapshot: no providers enabled.
    ///
    /// `admin_key` is the server-held secret for configuration updates;
    /// an empty key is treated as unset.
    #[must_use]
    pub fn new(registry: Arc<Registry>, admin_key: Option<String>) -> Self {
        let admin_key = admin_key.filter(|k| !k.is_empty());
        Self {
            registry,
            current: RwLock::new(Arc::new(Snapshot::empty(admin_key.clone()))),
            admin_key,
            apply_lock: Mutex::new(()),
        }
    }

    /// The snapshot in effect right now.
    pub async fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Validate `document`, load every provider it enables and publish the
    /// result. On any error the previously published snapshot stays in place.
    pub async fn apply(
        &self,
        mut document: Config,
        source_name: &str,
        version: ConfigVersion,
    ) -> Result<Arc<Snapshot>, HeraldError> {
        validate(&document).map_err(|errors| HeraldError::ConfigValidation { errors })?;
        document.key = None;

        let _serialized = self.apply_lock.lock().await;

        let ignore = document.ignore_not_supported_provider;
        let mut emails = BTreeMap::new();
        let mut smses = BTreeMap::new();
        let loaded = resolve(
            Category::Email,
            &document.emails,
            ignore,
            |name| self.registry.email(name),
            &mut emails,
        )
        .and_then(|()| {
            resolve(
                Category::Sms,
                &document.smses,
                ignore,
                |name| self.registry.sms(name),
                &mut smses,
            )
        });
        if let Err(err) = loaded {
            let previous = self.current().await;
            restore(Category::Email, &emails, &previous.document.emails);
            restore(Category::Sms, &smses, &previous.document.smses);
            return Err(err);
        }

        let snapshot = Arc::new(Snapshot {
            allow_get: document.allow_get,
            ignore_not_supported_provider: ignore,
            timeout: Duration::from_millis(document.timeout),
            admin_key: self.admin_key.clone(),
            emails,
            smses,
            document,
            version,
            source_name: source_name.to_string(),
            loaded_at: Instant::now(),
        });

        *self.current.write().await = Arc::clone(&snapshot);

        tracing::info!(
            source = %snapshot.source_name,
            version = %snapshot.version.short(),
            emails = snapshot.emails.len(),
            smses = snapshot.smses.len(),
            "configuration applied"
        );
        Ok(snapshot)
    }
}

/// Look up and load every provider in `configs`, collecting the ones that
/// loaded into `resolved`. Stops at the first failure.
fn resolve<P>(
    category: Category,
    configs: &BTreeMap<String, ProviderConfig>,
    ignore_unknown: bool,
    lookup: impl Fn(&str) -> Option<Arc<P>>,
    resolved: &mut BTreeMap<String, Arc<P>>,
) -> Result<(), HeraldError>
where
    P: Configurable + ?Sized,
{
    for (name, raw) in configs {
        let Some(provider) = lookup(name) else {
            if ignore_unknown {
                tracing::warn!(%category, provider = %name, "skipping unsupported provider");
                continue;
            }
            return Err(HeraldError::ProviderNotFound {
                category,
                name: name.clone(),
            });
        };

        provider
            .load(raw)
            .map_err(|source| HeraldError::ProviderLoad {
                category,
                name: name.clone(),
                source,
            })?;
        resolved.insert(name.clone(), provider);
    }
    Ok(())
}

/// Reload providers touched by a rejected `apply` with the settings the
/// published snapshot still lists for them. Providers absent from that
/// snapshot are not reachable and are left alone.
fn restore<P>(
    category: Category,
    loaded: &BTreeMap<String, Arc<P>>,
    previous: &BTreeMap<String, ProviderConfig>,
) where
    P: Configurable + ?Sized,
{
    for (name, provider) in loaded {
        let Some(raw) = previous.get(name) else {
            continue;
        };
        match provider.load(raw) {
            Ok(()) => tracing::debug!(%category, provider = %name, "restored previous settings"),
            Err(error) => tracing::error!(
                %category,
                provider = %name,
                %error,
                "failed to restore previous settings"
            ),
        }
    }
}
