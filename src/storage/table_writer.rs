use error_stack::ResultExt;
use thiserror::Error;
use tracing::{info, instrument};

use super::{Destination, ObjectStore, StorageError};
use crate::retry::RetryPolicy;
use crate::table::{parquet_codec, Table};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    #[error("Could not make sure the destination bucket exists")]
    Bucket,
    #[error("Could not serialize the table")]
    Encode,
    #[error("Could not upload the table")]
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Existed,
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub url: String,
    pub bucket: BucketStatus,
    pub rows: usize,
    pub columns: usize,
    pub bytes: usize,
}

/// Writes tables as parquet objects to one destination.
pub struct TableWriter<'a> {
    store: &'a dyn ObjectStore,
    destination: &'a Destination,
    retry: RetryPolicy,
}

impl<'a> TableWriter<'a> {
    pub fn new(store: &'a dyn ObjectStore, destination: &'a Destination, retry: RetryPolicy) -> Self {
        Self {
            store,
            destination,
            retry,
        }
    }

    /// Creates the bucket when, and only when, the existence check says it is missing.
    #[instrument(skip(self), fields(bucket = %self.destination.bucket))]
    pub async fn ensure_bucket(&self) -> error_stack::Result<BucketStatus, StorageError> {
        let bucket = self.destination.bucket.as_str();
        match self.store.head_bucket(bucket).await {
            Ok(()) => Ok(BucketStatus::Existed),
            Err(report) if *report.current_context() == StorageError::NotFound => {
                info!(region = %self.destination.region, "S3 bucket doesn't exist, creating...");
                self.store
                    .create_bucket(bucket, &self.destination.region)
                    .await
                    .attach_printable_lazy(|| format!("creating bucket {bucket}"))?;
                Ok(BucketStatus::Created)
            }
            Err(report) => Err(report.attach_printable(format!("checking bucket {bucket}"))),
        }
    }

    #[instrument(skip(self, table), fields(destination = %self.destination))]
    pub async fn write(&self, table: &Table) -> error_stack::Result<UploadSummary, WriteError> {
        let body = parquet_codec::encode(table).change_context(WriteError::Encode)?;
        let bucket = self.ensure_bucket().await.change_context(WriteError::Bucket)?;
        let bytes = body.len();

        self.retry
            .run(
                "put_object",
                StorageError::is_transient,
                || {
                    self.store.put_object(
                        &self.destination.bucket,
                        &self.destination.object,
                        body.clone(),
                        parquet_codec::CONTENT_TYPE,
                    )
                },
            )
            .await
            .change_context(WriteError::Upload)
            .attach_printable_lazy(|| self.destination.url())?;

        let (rows, columns) = table.shape();
        info!(rows, columns, bytes, "Wrote {}", self.destination);
        Ok(UploadSummary {
            url: self.destination.url(),
            bucket,
            rows,
            columns,
            bytes,
        })
    }
}
