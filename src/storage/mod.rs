pub mod s3;
pub mod table_writer;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use s3::S3ObjectStore;
pub use table_writer::{BucketStatus, TableWriter, UploadSummary, WriteError};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("Bucket or object does not exist")]
    NotFound,
    #[error("Access to the bucket was denied")]
    PermissionDenied,
    #[error("Transient object store failure")]
    Transient,
    #[error("Object store request failed")]
    Other,
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient)
    }
}

/// Bucket and object primitives the table writer needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Succeeds when the bucket exists and is reachable.
    async fn head_bucket(&self, bucket: &str) -> error_stack::Result<(), StorageError>;

    async fn create_bucket(&self, bucket: &str, region: &str)
        -> error_stack::Result<(), StorageError>;

    /// Writes the whole object in one request, replacing any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> error_stack::Result<(), StorageError>;
}

/// Where the table ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub bucket: String,
    pub object: String,
    /// Region the bucket is created in when it does not exist yet.
    pub region: String,
}

impl Destination {
    pub fn new(
        bucket: impl Into<String>,
        object: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            region: region.into(),
        }
    }

    pub fn url(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.object)
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url())
    }
}
