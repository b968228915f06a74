//! Publication of finished run artifacts to durable storage.
//!
//! The pipeline never retries a publish; a [`Publisher`] implementation may.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, instrument};

use crate::error::{Result, StorageError};
use crate::object_store::ObjectStorage;

/// Moves local artifacts to durable storage.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Upload one file to `key`, returning the number of bytes written.
    async fn publish_file(&self, local: &Path, key: &str) -> Result<u64>;

    /// Upload every file below `local` under `prefix`, keeping relative paths.
    async fn publish_directory(&self, local: &Path, prefix: &str) -> Result<u64>;
}

/// Publisher backed by an [`ObjectStorage`] client.
#[derive(Debug, Clone)]
pub struct ObjectStorePublisher {
    storage: ObjectStorage,
}

impl ObjectStorePublisher {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Publisher for ObjectStorePublisher {
    fn name(&self) -> &str {
        self.storage.bucket()
    }

    #[instrument(skip(self), fields(local = %local.display()))]
    async fn publish_file(&self, local: &Path, key: &str) -> Result<u64> {
        let data = tokio::fs::read(local).await?;
        let size = data.len() as u64;
        self.storage.put(key, Bytes::from(data)).await?;
        debug!(size, "Published file");
        Ok(size)
    }

    #[instrument(skip(self), fields(local = %local.display()))]
    async fn publish_directory(&self, local: &Path, prefix: &str) -> Result<u64> {
        let mut total_size = 0u64;
        let mut files = 0usize;

        for entry in walkdir::WalkDir::new(local).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(local)
                .map_err(|e| StorageError::Local(e.to_string()))?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let key = if prefix.is_empty() {
                relative
            } else {
                format!("{}/{}", prefix.trim_end_matches('/'), relative)
            };

            total_size += self.publish_file(entry.path(), &key).await?;
            files += 1;
        }

        info!(files, bytes = total_size, "Published directory");
        Ok(total_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"abc").unwrap();
        std::fs::create_dir_all(dir.path().join("tiles/0/0")).unwrap();
        std::fs::write(dir.path().join("tiles/0/0/0.png"), b"tile").unwrap();

        let root = tempfile::tempdir().unwrap();
        let publisher = ObjectStorePublisher::new(ObjectStorage::local(root.path()).unwrap());

        let size = publisher
            .publish_file(&dir.path().join("a.png"), "p/a.png")
            .await
            .unwrap();
        assert_eq!(size, 3);

        let total = publisher
            .publish_directory(&dir.path().join("tiles"), "p/tiles/")
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(std::fs::read(root.path().join("p/a.png")).unwrap(), b"abc");
        assert_eq!(
            std::fs::read(root.path().join("p/tiles/0/0/0.png")).unwrap(),
            b"tile"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_local_error() {
        let root = tempfile::tempdir().unwrap();
        let publisher = ObjectStorePublisher::new(ObjectStorage::local(root.path()).unwrap());
        let err = publisher
            .publish_file(Path::new("/nonexistent/wind.png"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Local(_)));
    }
}
