//! Configuration loading, validation, and hot-swapping.
//!
//! Defines the [`ConfigSource`] trait for pluggable config backends and
//! the [`ConfigVersion`] enum for change detection. Submodules provide
//! the document model, validation logic, concrete source implementations,
//! and the [`manager`] that turns a document into the live snapshot
//! used by request handlers.

pub mod manager;
pub mod model;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::HeraldError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    /// Nothing has been applied yet.
    Empty,
    Hash(String),
}

impl ConfigVersion {
    /// Short form for logs and the health endpoint.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Empty => "empty",
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

// async_trait keeps ConfigSource usable as a trait object; native async fn in
// traits does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Config, ConfigVersion), HeraldError>;
    async fn has_changed(&self, current: &ConfigVersion) -> Result<bool, HeraldError>;
}
