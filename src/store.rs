//! Object-store interface and a filesystem-backed implementation.
//!
//! The pipeline never talks to a concrete store directly: all list/get/put
//! traffic goes through the [`ObjectStore`] trait, constructed by the caller
//! and passed into the pipeline. The trait is annotated for `mockall` so tests
//! can drive deterministic substitutes.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Errors from a store implementation are opaque to the pipeline; stages
/// decide per call whether they are fatal or tolerated.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Listing entry: just the full object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
}

/// Minimal object-store surface the pipeline needs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all objects whose key starts with `prefix` in `bucket`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSummary>, StoreError>;

    /// Fetch the full body of one object.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Store one object under `key` with the given content type.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;
}

/// Filesystem-backed store: buckets are directories under a root, object keys
/// are relative paths. Used for local runs and integration tests.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSummary>, StoreError> {
        let dir = self.root.join(bucket).join(prefix);
        if !dir.is_dir() {
            // Listing an unknown prefix yields an empty result, not an error.
            return Ok(Vec::new());
        }
        let mut objects = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            objects.push(ObjectSummary {
                key: format!("{prefix}/{file_name}"),
            });
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        Ok(fs::read(self.object_path(bucket, key))?)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, body)?;
        Ok(())
    }
}
