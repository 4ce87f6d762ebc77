//! Client-facing request and response bodies for the upload lifecycle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /uploads`.
///
/// Field aliases accept the older `fileName`/`fileType`/`fileSize` shape.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct BeginUploadRequest {
    #[serde(default, alias = "fileName")]
    pub name: String,

    #[serde(default, alias = "fileType")]
    pub mime_type: String,

    #[serde(default, alias = "fileSize")]
    pub declared_size: i64,

    /// Required once the declared size crosses the multipart threshold.
    #[serde(default)]
    pub chunk_size: Option<i64>,
}

/// What the client must do to push its bytes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum UploadPlanResult {
    /// Multipart is listed first so untagged deserialization does not stop at
    /// the smaller shape.
    Multipart {
        #[serde(rename = "uploadID")]
        upload_id: String,
        #[serde(rename = "fileID")]
        file_id: Uuid,
        /// `part_urls[i]` uploads part number `i + 1`.
        #[serde(rename = "partURLs")]
        part_urls: Vec<String>,
    },
    Single {
        #[serde(rename = "uploadURL")]
        upload_url: String,
        #[serde(rename = "fileID")]
        file_id: Uuid,
    },
}

impl UploadPlanResult {
    pub fn file_id(&self) -> Uuid {
        match self {
            UploadPlanResult::Single { file_id, .. } | UploadPlanResult::Multipart { file_id, .. } => {
                *file_id
            }
        }
    }
}

/// One uploaded part as reported by the client at completion time.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PartCompletion {
    #[serde(rename = "partNumber", alias = "PartNumber")]
    pub part_number: i32,

    #[serde(rename = "eTag", alias = "ETag", alias = "etag")]
    pub e_tag: String,
}

impl PartCompletion {
    pub fn new(part_number: i32, e_tag: impl Into<String>) -> Self {
        Self {
            part_number,
            e_tag: e_tag.into(),
        }
    }
}

/// Body of `POST /uploads/complete`.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct CompleteUploadRequest {
    #[serde(default, rename = "fileID", alias = "fileId")]
    pub file_id: String,

    #[serde(default, rename = "uploadID", alias = "uploadId")]
    pub upload_id: String,

    #[serde(default)]
    pub parts: Vec<PartCompletion>,
}

/// Returned once a multipart upload has been finalized.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CompletionConfirmation {
    #[serde(rename = "fileID")]
    pub file_id: Uuid,
    pub message: String,
}

/// Returned by `GET /downloads`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponse {
    pub download_url: String,
    pub file_name: String,
    pub content_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}
