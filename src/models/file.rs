//! Represents a logical file whose bytes live in the object store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a [`FileRecord`].
///
/// States only move forward: `Pending -> Uploading -> Completed`. Any
/// non-terminal state may be reclaimed into `Abandoned` by the sweeper.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "PascalCase")]
pub enum FileStatus {
    /// Record written, no bytes confirmed yet.
    Pending,
    /// A multipart session exists in the object store.
    Uploading,
    /// Bytes are finalized in the object store.
    Completed,
    /// Session went stale and was reclaimed.
    Abandoned,
}

impl FileStatus {
    fn rank(self) -> u8 {
        match self {
            FileStatus::Pending => 0,
            FileStatus::Uploading => 1,
            FileStatus::Completed | FileStatus::Abandoned => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Abandoned)
    }

    /// Whether a record in `self` may be moved to `next`.
    pub fn can_advance_to(self, next: FileStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Pending => "Pending",
            FileStatus::Uploading => "Uploading",
            FileStatus::Completed => "Completed",
            FileStatus::Abandoned => "Abandoned",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and lifecycle anchor for one logical file.
///
/// The object store key of the payload is the string form of `file_id`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique identifier, assigned once at plan time.
    #[serde(rename = "fileID")]
    pub file_id: Uuid,

    /// Subject of the identity that created the record. Never changes.
    #[serde(rename = "ownerID")]
    pub owner_id: String,

    /// Client supplied file name.
    pub name: String,

    /// Size in bytes. Client declared until the object store reports the stored size.
    pub declared_size: i64,

    /// MIME type used for presigned PUT and GET requests.
    pub mime_type: String,

    pub status: FileStatus,

    /// Multipart session handle issued by the object store, if any.
    #[serde(rename = "uploadID", skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,

    /// Number of parts planned for a multipart session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_count: Option<i64>,

    /// Client declared part size for a multipart session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<i64>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// A fresh `Pending` record owned by `owner_id`.
    pub fn new_pending(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        declared_size: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            file_id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.into(),
            declared_size,
            mime_type: mime_type.into(),
            status: FileStatus::Pending,
            upload_id: None,
            part_count: None,
            chunk_size: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Object store key for this file's payload.
    pub fn object_key(&self) -> String {
        self.file_id.to_string()
    }
}
