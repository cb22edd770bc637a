//! Local directory page writer
//!
//! Mirrors the object store layout on disk as `<root>/<bucket>/<key>`, one
//! JSON Lines file per page. Used by local runs.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{ConfigError, Result, StoreError};

use super::PageWriter;

/// Writer storing pages under a local directory
#[derive(Debug, Clone)]
pub struct FilePageWriter {
    /// Root directory; buckets become subdirectories
    root: PathBuf,
}

impl FilePageWriter {
    /// Create a new directory writer
    ///
    /// # Arguments
    /// * `root` - Existing directory to write under
    ///
    /// # Returns
    /// * `Result<Self>` - New writer instance or error
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "output_dir".to_string(),
                value: root.display().to_string(),
            }
            .into());
        }
        Ok(Self { root })
    }

    /// Path a page will be written to
    pub fn path_for(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StoreError::Permission(format!(
                "Refusing to write outside {}: {}",
                self.root.display(),
                relative.display()
            ))
            .into());
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl PageWriter for FilePageWriter {
    async fn write(&self, bucket: &str, key: &str, body: String) -> Result<()> {
        let path = self.path_for(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Network(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StoreError::Network(format!("Failed to create file {}: {e}", path.display()))
        })?;
        file.write_all(body.as_bytes())
            .await
            .map_err(|e| StoreError::Network(format!("Failed to write to file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| StoreError::Network(format!("Failed to flush file: {e}")))?;

        debug!("Wrote {} bytes to {}", body.len(), path.display());
        info!("Put Object: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scrolldump-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_file_writer_basic() {
        let dir = scratch_dir("basic");
        let writer = FilePageWriter::new(&dir).unwrap();

        writer
            .write("dumps", "logs/dumpdata-x", "{\"a\": 1}\n{\"a\": 2}".into())
            .await
            .unwrap();

        let content = fs::read_to_string(dir.join("dumps/logs/dumpdata-x")).await.unwrap();
        assert_eq!(content.lines().count(), 2);

        // Cleanup
        fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_file_writer_rejects_traversal() {
        let dir = scratch_dir("traversal");
        let writer = FilePageWriter::new(&dir).unwrap();

        let err = writer.write("dumps", "../../etc/x", String::new()).await.unwrap_err();
        assert_eq!(err.kind(), "permission");

        fs::remove_dir_all(&dir).await.ok();
    }

    #[test]
    fn test_file_writer_invalid_directory() {
        let err = FilePageWriter::new("/nonexistent/directory").unwrap_err();
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().contains("output_dir"));
    }
}
