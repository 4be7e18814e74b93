//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! Provides the file-based source (YAML, JSON, TOML; YAML and TOML gated
//! by feature flags) and the [`parse_config_str`] helper for format-specific deserialization.
//! The admin API reuses [`parse_document`] and [`sha256_hex`] so documents
//! submitted over HTTP are versioned the same way as files on disk.

pub mod file_source;

use sha2::{Digest, Sha256};

use crate::config::model::Config;
use crate::config::ConfigVersion;
use crate::error::HeraldError;

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, HeraldError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| HeraldError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        "json" => serde_json::from_str(content).map_err(|e| HeraldError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| HeraldError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(HeraldError::UnsupportedFormat(other.to_string())),
    }
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Deserialize a JSON document into [`Config`] and compute its version hash.
///
/// Structural validation happens later, in
/// [`ConfigManager::apply`](crate::config::manager::ConfigManager::apply).
pub fn parse_document(
    json: &[u8],
    source_label: &str,
) -> Result<(Config, ConfigVersion), HeraldError> {
    let config: Config = serde_json::from_slice(json).map_err(|e| HeraldError::ConfigParse {
        path: source_label.to_string(),
        source: Box::new(e),
    })?;

    let hash = sha256_hex(json);
    Ok((config, ConfigVersion::Hash(hash)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_always_supported() {
        let config = parse_config_str("json", r#"{"allow_get": true}"#, "inline").unwrap();
        assert!(config.allow_get);
    }

    #[test]
    fn unsupported_format_returns_error() {
        let err = parse_config_str("xml", "<config/>", "herald.xml").unwrap_err();
        assert!(matches!(err, HeraldError::UnsupportedFormat(ref ext) if ext == "xml"));
    }

    #[test]
    fn parse_document_hashes_raw_bytes() {
        let body = br#"{"emails": {"log": {}}}"#;
        let (config, version) = parse_document(body, "api").unwrap();
        assert!(config.emails.contains_key("log"));
        assert_eq!(version, ConfigVersion::Hash(sha256_hex(body)));
    }

    #[test]
    fn parse_document_reports_source_label() {
        let err = parse_document(b"not json", "POST /v1/config").unwrap_err();
        assert!(err.to_string().contains("POST /v1/config"));
    }
}
