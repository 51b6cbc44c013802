use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;
use error_stack::report;
use tracing::{debug, instrument};

use super::{ObjectStore, StorageError};

/// S3 rejects an explicit location constraint for its default region.
const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client from the standard AWS provider chain, pinned to `region` so that
    /// bucket creation and the location constraint agree.
    pub async fn from_env(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(Client::new(&sdk_config))
    }
}

fn kind_from_response(status: u16, code: Option<&str>) -> StorageError {
    match (status, code) {
        (404, _) | (_, Some("NoSuchBucket" | "NotFound")) => StorageError::NotFound,
        (401 | 403, _) | (_, Some("AccessDenied" | "AllAccessDisabled")) => {
            StorageError::PermissionDenied
        }
        (429 | 500..=599, _) | (_, Some("SlowDown" | "RequestTimeout")) => StorageError::Transient,
        _ => StorageError::Other,
    }
}

fn classify<E>(error: &SdkError<E>) -> StorageError
where
    E: ProvideErrorMetadata,
{
    match error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StorageError::Transient
        }
        SdkError::ServiceError(service) => {
            kind_from_response(service.raw().status().as_u16(), service.err().code())
        }
        _ => StorageError::Other,
    }
}

fn to_report<E>(error: SdkError<E>) -> error_stack::Report<StorageError>
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let kind = classify(&error);
    let message = error
        .as_service_error()
        .and_then(|e| e.message())
        .map(str::to_string);
    let report = report!(error).change_context(kind);
    match message {
        Some(message) => report.attach_printable(message),
        None => report,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn head_bucket(&self, bucket: &str) -> error_stack::Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(to_report)
    }

    #[instrument(skip(self))]
    async fn create_bucket(
        &self,
        bucket: &str,
        region: &str,
    ) -> error_stack::Result<(), StorageError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(output) => {
                debug!(location = ?output.location(), "Bucket created");
                Ok(())
            }
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(|e| e.is_bucket_already_owned_by_you()) =>
            {
                debug!("Bucket already owned by us");
                Ok(())
            }
            Err(error) => Err(to_report(error)),
        }
    }

    #[instrument(skip(self, body), fields(bytes = body.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> error_stack::Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(to_report)
    }
}
