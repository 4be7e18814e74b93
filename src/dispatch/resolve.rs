//! Selector parsing and provider resolution against a snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::model::ALL_PROVIDERS;
use crate::error::HeraldError;
use crate::provider::Category;

/// Which provider(s) a request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// No provider given: use the category default.
    Default,
    Named(String),
    /// Every enabled provider, tried in name order until one succeeds.
    All,
}

impl Selector {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => Self::Default,
            ALL_PROVIDERS => Self::All,
            name => Self::Named(name.to_string()),
        }
    }
}

/// Resolved targets for one request.
pub enum Plan<P: ?Sized> {
    Single(String, Arc<P>),
    /// Non-empty, in lexicographic name order.
    All(Vec<(String, Arc<P>)>),
}

impl<P: ?Sized> std::fmt::Debug for Plan<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(name, _) => f.debug_tuple("Single").field(name).finish(),
            Self::All(targets) => f
                .debug_tuple("All")
                .field(&targets.iter().map(|(n, _)| n).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Resolve `selector` against the providers enabled in a snapshot.
///
/// `default` is the snapshot's default for the category (already
/// including the email fallback).
pub fn resolve<P: ?Sized>(
    category: Category,
    selector: &Selector,
    providers: &BTreeMap<String, Arc<P>>,
    default: Option<&str>,
) -> Result<Plan<P>, HeraldError> {
    let name = match selector {
        Selector::All => {
            if providers.is_empty() {
                return Err(HeraldError::ProviderNotFound {
                    category,
                    name: ALL_PROVIDERS.into(),
                });
            }
            // BTreeMap iteration gives the documented lexicographic order
            let targets = providers
                .iter()
                .map(|(name, p)| (name.clone(), Arc::clone(p)))
                .collect();
            return Ok(Plan::All(targets));
        }
        Selector::Named(name) => name.as_str(),
        Selector::Default => default.ok_or_else(|| {
            HeraldError::InvalidRequest(format!(
                "no {category} provider given and no default {category} provider configured"
            ))
        })?,
    };

    // A default of "all" fans out just like an explicit selector.
    if name == ALL_PROVIDERS {
        return resolve(category, &Selector::All, providers, None);
    }

    providers.get(name).map_or_else(
        || {
            Err(HeraldError::ProviderNotFound {
                category,
                name: name.to_string(),
            })
        },
        |p| Ok(Plan::Single(name.to_string(), Arc::clone(p))),
    )
}
