//! Object storage client for published wind tiles (S3/MinIO or local disk).

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, local::LocalFileSystem, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use wind_common::ModelRun;

use crate::error::{Result, StorageError};

/// Configuration for an S3-compatible connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    #[serde(default = "default_region")]
    pub region: String,
    /// Allow HTTP (for local MinIO)
    #[serde(default)]
    pub allow_http: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "wind-tiles".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: default_region(),
            allow_http: true,
        }
    }
}

impl ObjectStorageConfig {
    /// Read `S3_*` variables, falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("S3_ENDPOINT").unwrap_or(defaults.endpoint),
            bucket: std::env::var("S3_BUCKET").unwrap_or(defaults.bucket),
            access_key_id: std::env::var("S3_ACCESS_KEY").unwrap_or(defaults.access_key_id),
            secret_access_key: std::env::var("S3_SECRET_KEY")
                .unwrap_or(defaults.secret_access_key),
            region: std::env::var("S3_REGION").unwrap_or(defaults.region),
            allow_http: std::env::var("S3_ALLOW_HTTP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.allow_http),
        }
    }
}

/// Object storage client.
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl ObjectStorage {
    /// Connect to an S3-compatible bucket.
    pub fn new(config: &ObjectStorageConfig) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Client(e.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// Store objects as files below `root`, which must already exist.
    pub fn local(root: impl AsRef<std::path::Path>) -> Result<Self> {
        let root = root.as_ref();
        let store = LocalFileSystem::new_with_prefix(root)
            .map_err(|e| StorageError::Client(e.to_string()))?;
        Ok(Self {
            store: Arc::new(store),
            bucket: root.display().to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Write bytes to a path in the bucket.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| StorageError::write(path, e))?;

        Ok(())
    }
}

/// Path builder for the published layout.
pub struct StoragePath;

impl StoragePath {
    /// Directory holding one run's artifacts.
    /// Format: {prefix}/{YYYY-MM-DD}/{HH}Z
    pub fn run_prefix(prefix: &str, run: &ModelRun) -> String {
        join(prefix, &format!("{}/{:02}Z", run.iso_date(), run.cycle_hour()))
    }

    /// Format: {prefix}/{YYYY-MM-DD}/{HH}Z/{file}
    pub fn wind_tile(prefix: &str, run: &ModelRun, file: &str) -> String {
        format!("{}/{}", Self::run_prefix(prefix, run), file)
    }

    /// Latest-run metadata pointer.
    /// Format: {prefix}/metadata.json
    pub fn latest_metadata(prefix: &str) -> String {
        join(prefix, "metadata.json")
    }
}

fn join(prefix: &str, rest: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", prefix, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn run() -> ModelRun {
        ModelRun::new(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_storage_paths() {
        assert_eq!(
            StoragePath::wind_tile("wind", &run(), "wind_20240115_t09z_f01.png"),
            "wind/2024-01-15/09Z/wind_20240115_t09z_f01.png"
        );
        assert_eq!(StoragePath::latest_metadata("wind/"), "wind/metadata.json");
        assert_eq!(StoragePath::run_prefix("", &run()), "2024-01-15/09Z");
    }

    #[tokio::test]
    async fn test_local_put_writes_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ObjectStorage::local(dir.path()).unwrap();
        storage.put("a/b.png", Bytes::from_static(b"png")).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("a/b.png")).unwrap(), b"png");
        assert_eq!(storage.bucket(), dir.path().display().to_string());
    }

    #[test]
    fn test_local_requires_existing_root() {
        assert!(matches!(
            ObjectStorage::local("/nonexistent/wind-tiles-root"),
            Err(StorageError::Client(_))
        ));
    }
}
