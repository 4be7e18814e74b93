//! Unified error types for Herald.
//!
//! Defines [`HeraldError`] (the main crate error enum) and
//! [`ValidationError`] for config document validation failures. Both use
//! `thiserror` for `Display` and `Error` derives. Error messages
//! include contextual hints to guide the user toward a fix.
//!
//! [`HeraldError::status_code`] is the single place where errors are
//! mapped onto HTTP status codes for the API boundary.

use std::path::PathBuf;

use axum::http::StatusCode;

use crate::provider::registry::RegistryError;
use crate::provider::{Category, LoadError, SendError};

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub section: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {}: {}", self.section, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HeraldError {
    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{category} provider '{name}' not found")]
    ProviderNotFound { category: Category, name: String },

    #[error("failed to load {category} provider '{name}': {source}")]
    ProviderLoad {
        category: Category,
        name: String,
        #[source]
        source: LoadError,
    },

    #[error("no {0} provider is configured")]
    NotConfigured(Category),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("admin key is required")]
    Unauthorized,

    #[error("admin key does not match")]
    Forbidden,

    #[error("{category} provider '{provider}' failed after {attempts} attempt(s): {source}")]
    Send {
        category: Category,
        provider: String,
        attempts: u32,
        #[source]
        source: SendError,
    },

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),
}

impl HeraldError {
    /// HTTP status returned to API callers for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigParse { .. }
            | Self::ConfigValidation { .. }
            | Self::UnsupportedFormat(_)
            | Self::ProviderNotFound { .. }
            | Self::ProviderLoad { .. }
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
