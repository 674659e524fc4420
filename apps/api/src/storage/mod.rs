use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;

/// Blob storage. Uploading to an existing key overwrites it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns the object URL.
    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, AppError>;
}

pub fn resume_key(user_id: uuid::Uuid) -> String {
    format!("resumes/{user_id}.pdf")
}

/// S3 / MinIO object store.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    endpoint: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, endpoint: String) -> Self {
        Self {
            client,
            bucket,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("put_object {key}: {e}")))?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{}/{}", self.endpoint, self.bucket, key))
    }
}
