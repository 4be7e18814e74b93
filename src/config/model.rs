//! Serde data structures for the Herald configuration document.
//!
//! [`Config`] is what an operator writes in `herald.yaml` (or submits to
//! `POST /v1/config`). It names the enabled providers per category and
//! carries their raw, string-only settings; the
//! [`ConfigManager`](crate::config::manager::ConfigManager) turns it into
//! a live [`Snapshot`](crate::config::manager::Snapshot).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::provider::{Category, ProviderConfig};

/// Email provider used when neither the request nor the config names one.
pub const FALLBACK_EMAIL_PROVIDER: &str = "plain";

/// Selector that targets every enabled provider of a category.
pub const ALL_PROVIDERS: &str = "all";

const REDACTED: &str = "******";
const SENSITIVE_KEYS: &[&str] = &["password", "secret", "token", "key", "credential"];

const fn default_timeout() -> u64 {
    30_000
}

fn is_default_timeout(v: &u64) -> bool {
    *v == default_timeout()
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn mask_credentials(
    providers: &BTreeMap<String, ProviderConfig>,
) -> BTreeMap<String, ProviderConfig> {
    providers
        .iter()
        .map(|(name, settings)| {
            let settings = settings
                .iter()
                .map(|(k, v)| {
                    let lower = k.to_ascii_lowercase();
                    if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                        (k.clone(), REDACTED.to_string())
                    } else {
                        (k.clone(), v.clone())
                    }
                })
                .collect();
            (name.clone(), settings)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Accept `GET` on the send endpoints.
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_get: bool,

    /// Skip, instead of rejecting, providers whose kind is not registered.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_not_supported_provider: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_email_provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sms_provider: Option<String>,

    /// Per-attempt send timeout in milliseconds.
    #[serde(
        default = "default_timeout",
        skip_serializing_if = "is_default_timeout"
    )]
    pub timeout: u64,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub emails: BTreeMap<String, ProviderConfig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub smses: BTreeMap<String, ProviderConfig>,

    /// Admin key presented with `POST /v1/config`. Never serialized.
    #[serde(default, skip_serializing)]
    pub key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_get: false,
            ignore_not_supported_provider: false,
            default_email_provider: None,
            default_sms_provider: None,
            timeout: default_timeout(),
            emails: BTreeMap::new(),
            smses: BTreeMap::new(),
            key: None,
        }
    }
}

impl Config {
    #[must_use]
    pub const fn providers(&self, category: Category) -> &BTreeMap<String, ProviderConfig> {
        match category {
            Category::Email => &self.emails,
            Category::Sms => &self.smses,
        }
    }

    #[must_use]
    pub fn default_provider(&self, category: Category) -> Option<&str> {
        match category {
            Category::Email => self.default_email_provider.as_deref(),
            Category::Sms => self.default_sms_provider.as_deref(),
        }
    }

    #[must_use]
    pub fn total_providers(&self) -> usize {
        self.emails.len() + self.smses.len()
    }

    /// Copy of the document safe to hand back to API callers: the admin
    /// key is dropped and credential-like values are masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            emails: mask_credentials(&self.emails),
            smses: mask_credentials(&self.smses),
            key: None,
            ..self.clone()
        }
    }
}
