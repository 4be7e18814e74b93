//! Table of provider kinds available to the configuration manager.
//!
//! Each kind name maps to one shared provider instance per category.
//! The registry is filled once at startup and then frozen behind an
//! `Arc`; request traffic only ever reads it.

use std::collections::HashMap;
use std::sync::Arc;

use super::{logger::LogProvider, plain::PlainEmail, Category, EmailProvider, SmsProvider};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{category} provider '{name}' has already been registered")]
    AlreadyRegistered { category: Category, name: String },
}

#[derive(Default)]
pub struct Registry {
    emails: HashMap<String, Arc<dyn EmailProvider>>,
    smses: HashMap<String, Arc<dyn SmsProvider>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the providers that ship with Herald:
    /// `plain` (SMTP email) and `log` (email and SMS).
    pub fn with_builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_email("plain", Arc::new(PlainEmail::new()))?;
        let log = Arc::new(LogProvider::new());
        registry.register_email("log", log.clone())?;
        registry.register_sms("log", log)?;
        Ok(registry)
    }

    pub fn register_email(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn EmailProvider>,
    ) -> Result<(), RegistryError> {
        insert_unique(&mut self.emails, Category::Email, name.into(), provider)
    }

    pub fn register_sms(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn SmsProvider>,
    ) -> Result<(), RegistryError> {
        insert_unique(&mut self.smses, Category::Sms, name.into(), provider)
    }

    #[must_use]
    pub fn email(&self, name: &str) -> Option<Arc<dyn EmailProvider>> {
        self.emails.get(name).cloned()
    }

    #[must_use]
    pub fn sms(&self, name: &str) -> Option<Arc<dyn SmsProvider>> {
        self.smses.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, category: Category, name: &str) -> bool {
        match category {
            Category::Email => self.emails.contains_key(name),
            Category::Sms => self.smses.contains_key(name),
        }
    }

    /// Registered kind names for a category, sorted.
    #[must_use]
    pub fn kinds(&self, category: Category) -> Vec<&str> {
        let mut names: Vec<&str> = match category {
            Category::Email => self.emails.keys().map(String::as_str).collect(),
            Category::Sms => self.smses.keys().map(String::as_str).collect(),
        };
        names.sort_unstable();
        names
    }
}

fn insert_unique<P: ?Sized>(
    table: &mut HashMap<String, Arc<P>>,
    category: Category,
    name: String,
    provider: Arc<P>,
) -> Result<(), RegistryError> {
    if table.contains_key(&name) {
        return Err(RegistryError::AlreadyRegistered { category, name });
    }
    table.insert(name, provider);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Configurable, LoadError, ProviderConfig, SendError, SmsMessage};
    use async_trait::async_trait;

    struct Tagged(&'static str);

    impl Configurable for Tagged {
        fn load(&self, _config: &ProviderConfig) -> Result<(), LoadError> {
            Ok(())
        }
    }

    #[async_trait]
    impl SmsProvider for Tagged {
        async fn send_sms(&self, _message: &SmsMessage) -> Result<(), SendError> {
            Err(SendError::InvalidMessage(self.0.into()))
        }
    }

    #[test]
    fn builtin_registry_has_plain_and_log() {
        let registry = Registry::with_builtin().unwrap();
        assert_eq!(registry.kinds(Category::Email), vec!["log", "plain"]);
        assert_eq!(registry.kinds(Category::Sms), vec!["log"]);
        assert!(registry.email("plain").is_some());
        assert!(registry.sms("plain").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_the_first_entry() {
        let mut registry = Registry::new();
        registry.register_sms("gw", Arc::new(Tagged("first"))).unwrap();

        let err = registry
            .register_sms("gw", Arc::new(Tagged("second")))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::AlreadyRegistered {
                category: Category::Sms,
                name: "gw".into(),
            }
        );

        let kept = registry.sms("gw").unwrap();
        let sent = kept.send_sms(&SmsMessage::default()).await.unwrap_err();
        assert!(sent.to_string().contains("first"));
    }

    #[test]
    fn same_name_in_different_categories_is_allowed() {
        let mut registry = Registry::new();
        let log = Arc::new(LogProvider::new());
        registry.register_email("log", log.clone()).unwrap();
        registry.register_sms("log", log).unwrap();
        assert!(registry.contains(Category::Email, "log"));
        assert!(registry.contains(Category::Sms, "log"));
    }
}
