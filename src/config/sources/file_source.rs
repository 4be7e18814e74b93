//! Async file-based config source with SHA256 change detection.
//!
//! [`FileSource`] implements [`ConfigSource`] for any supported file
//! format; [`FileSource::for_path`] picks the parser from the file
//! extension. Content is read asynchronously via Tokio and versioned by
//! its SHA256 hash, which the refresh loop compares to decide whether
//! the document on disk changed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{parse_config_str, sha256_hex};
use crate::config::model::Config;
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::HeraldError;

/// File names probed in the working directory when no `--config` is given.
pub const CANDIDATES: &[&str] = &["herald.yaml", "herald.yml", "herald.json", "herald.toml"];

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    ext: &'static str,
}

impl FileSource {
    /// Build a source for `path`, choosing the format from its extension.
    pub fn for_path(path: &Path) -> Result<Self, HeraldError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let (name, ext) = match ext {
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => ("yaml", "yaml"),
            "json" => ("json", "json"),
            #[cfg(feature = "toml")]
            "toml" => ("toml", "toml"),
            other => return Err(HeraldError::UnsupportedFormat(other.to_string())),
        };
        Ok(Self {
            path: path.to_path_buf(),
            name,
            ext,
        })
    }

    /// First of [`CANDIDATES`] that exists in the working directory.
    pub async fn detect() -> Result<Option<Self>, HeraldError> {
        for name in CANDIDATES {
            let path = PathBuf::from(name);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tracing::info!(path = %path.display(), "auto-detected config file");
                return Self::for_path(&path).map(Some);
            }
        }
        Ok(None)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_content(&self) -> Result<String, HeraldError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HeraldError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                HeraldError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), HeraldError> {
        let content = self.read_content().await?;
        let config = parse_config_str(self.ext, &content, &self.path.display().to_string())?;
        let hash = sha256_hex(content.as_bytes());
        Ok((config, ConfigVersion::Hash(hash)))
    }

    async fn has_changed(&self, current: &ConfigVersion) -> Result<bool, HeraldError> {
        let content = self.read_content().await?;
        let hash = sha256_hex(content.as_bytes());
        Ok(*current != ConfigVersion::Hash(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("herald-{}.{ext}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = FileSource::for_path(Path::new("herald.ini")).err().unwrap();
        assert!(matches!(err, HeraldError::UnsupportedFormat(ref ext) if ext == "ini"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = FileSource::for_path(&temp_path("json")).unwrap();
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, HeraldError::ConfigFileNotFound { .. }));
    }

    #[tokio::test]
    async fn change_detection_follows_file_content() {
        let path = temp_path("json");
        tokio::fs::write(&path, r#"{"emails": {"log": {}}}"#)
            .await
            .unwrap();

        let source = FileSource::for_path(&path).unwrap();
        let (config, version) = source.load().await.unwrap();
        assert!(config.emails.contains_key("log"));
        assert!(!source.has_changed(&version).await.unwrap());

        tokio::fs::write(&path, r#"{"smses": {"log": {}}}"#)
            .await
            .unwrap();
        assert!(source.has_changed(&version).await.unwrap());

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
