//! Object Store Gateway: presigned URLs and multipart primitives.
//!
//! The core never moves bytes itself. It hands clients presigned URLs and
//! drives the multipart session lifecycle through [`ObjectStoreGateway`].

pub mod s3;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use s3::S3Gateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The multipart session is unknown to the object store, usually because it
    /// expired or was aborted.
    #[error("multipart session `{upload_id}` not found")]
    SessionNotFound { upload_id: String },
    /// The object store refused the request as submitted (bad part list, etag
    /// mismatch, part too small).
    #[error("request rejected by object store: {0}")]
    Rejected(String),
    #[error("failed to presign request: {0}")]
    Presign(String),
    #[error("object store call failed: {0}")]
    Service(String),
}

impl GatewayError {
    /// Whether the client can recover by retrying or restarting its upload.
    pub fn is_client_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::SessionNotFound { .. } | GatewayError::Rejected(_)
        )
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// A finalized part passed to [`ObjectStoreGateway::complete_multipart`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: i32,
    pub e_tag: String,
}

#[async_trait]
pub trait ObjectStoreGateway: Send + Sync {
    async fn presign_put(&self, key: &str, content_type: &str, ttl: Duration)
    -> GatewayResult<String>;

    async fn presign_get(&self, key: &str, content_type: &str, ttl: Duration)
    -> GatewayResult<String>;

    /// Open a multipart session and return its `uploadID`.
    async fn create_multipart_session(&self, key: &str, content_type: &str)
    -> GatewayResult<String>;

    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        ttl: Duration,
    ) -> GatewayResult<String>;

    /// `parts` must already be in strictly ascending part-number order.
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> GatewayResult<()>;

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> GatewayResult<()>;

    async fn delete_object(&self, key: &str) -> GatewayResult<()>;
}
