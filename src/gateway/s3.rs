//! S3-compatible Object Store Gateway built on `aws-sdk-s3`.
//!
//! One configured [`Client`] is created at startup and shared by reference
//! across requests; this type holds no other state.

use super::{CompletedPart, GatewayError, GatewayResult, ObjectStoreGateway};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    presigning::PresigningConfig,
    types::{self, CompletedMultipartUpload},
};
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct S3Gateway {
    client: Client,
    bucket: String,
}

impl S3Gateway {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

fn presigning(ttl: Duration) -> GatewayResult<PresigningConfig> {
    PresigningConfig::expires_in(ttl).map_err(|err| GatewayError::Presign(err.to_string()))
}

/// Map an SDK failure onto the gateway taxonomy using the S3 error code.
fn classify<E, R>(op: &str, upload_id: Option<&str>, err: SdkError<E, R>) -> GatewayError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match (err.code(), upload_id) {
        (Some("NoSuchUpload"), Some(upload_id)) => GatewayError::SessionNotFound {
            upload_id: upload_id.to_string(),
        },
        (Some("InvalidPart" | "InvalidPartOrder" | "EntityTooSmall"), _) => {
            GatewayError::Rejected(format!("{op}: {}", DisplayErrorContext(&err)))
        }
        _ => GatewayError::Service(format!("{op}: {}", DisplayErrorContext(&err))),
    }
}

fn presign_failed<E, R>(op: &str, err: SdkError<E, R>) -> GatewayError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    GatewayError::Presign(format!("{op}: {}", DisplayErrorContext(&err)))
}

#[async_trait]
impl ObjectStoreGateway for S3Gateway {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> GatewayResult<String> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning(ttl)?)
            .await
            .map_err(|err| presign_failed("PutObject", err))?;
        Ok(request.uri().to_string())
    }

    async fn presign_get(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> GatewayResult<String> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_type(content_type)
            .presigned(presigning(ttl)?)
            .await
            .map_err(|err| presign_failed("GetObject", err))?;
        Ok(request.uri().to_string())
    }

    async fn create_multipart_session(
        &self,
        key: &str,
        content_type: &str,
    ) -> GatewayResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| classify("CreateMultipartUpload", None, err))?;

        let upload_id = output.upload_id().ok_or_else(|| {
            GatewayError::Service("CreateMultipartUpload returned no upload id".into())
        })?;
        debug!(key, upload_id, "created multipart session");
        Ok(upload_id.to_string())
    }

    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        ttl: Duration,
    ) -> GatewayResult<String> {
        let request = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .presigned(presigning(ttl)?)
            .await
            .map_err(|err| presign_failed("UploadPart", err))?;
        Ok(request.uri().to_string())
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> GatewayResult<()> {
        let parts = parts
            .iter()
            .map(|part| {
                types::CompletedPart::builder()
                    .e_tag(&part.e_tag)
                    .part_number(part.part_number)
                    .build()
            })
            .collect::<Vec<_>>();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|err| classify("CompleteMultipartUpload", Some(upload_id), err))?;
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> GatewayResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|err| classify("AbortMultipartUpload", Some(upload_id), err))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> GatewayResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify("DeleteObject", None, err))?;
        Ok(())
    }
}
