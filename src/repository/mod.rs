//! Metadata Repository: durable keyed store of [`FileRecord`]s.
//!
//! The orchestration core only talks to the [`MetadataRepository`] trait; the
//! SQLite adapter in [`sqlite`] is what the server binary wires in.

pub mod sqlite;

use crate::models::file::{FileRecord, FileStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use sqlite::SqliteMetadataRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("file `{0}` not found")]
    NotFound(Uuid),
    /// A conditional write found the record in a different status.
    #[error("file `{file_id}` is not in status {expected}")]
    Conflict { file_id: Uuid, expected: FileStatus },
    /// A status write that is unguarded or does not move forward.
    #[error(
        "file `{file_id}` cannot move to {next} from {}",
        .current.map_or("an unchecked status", FileStatus::as_str)
    )]
    IllegalTransition {
        file_id: Uuid,
        current: Option<FileStatus>,
        next: FileStatus,
    },
    #[error("file `{0}` already exists")]
    AlreadyExists(Uuid),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Fields changed by a partial update. `None` leaves the column untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileUpdate {
    pub status: Option<FileStatus>,
    pub declared_size: Option<i64>,
    pub upload_id: Option<String>,
    pub part_count: Option<i64>,
    pub chunk_size: Option<i64>,
    /// New `updated_at`; always written.
    pub updated_at: DateTime<Utc>,
}

impl FileUpdate {
    pub fn at(updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            ..Default::default()
        }
    }

    pub fn status(mut self, status: FileStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn declared_size(mut self, size: i64) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Status writes must name the status they move from, and only move forward.
    pub fn check_transition(
        &self,
        file_id: Uuid,
        expected_status: Option<FileStatus>,
    ) -> RepositoryResult<()> {
        let Some(next) = self.status else {
            return Ok(());
        };
        match expected_status {
            Some(current) if current.can_advance_to(next) => Ok(()),
            current => Err(RepositoryError::IllegalTransition {
                file_id,
                current,
                next,
            }),
        }
    }

    pub fn session(mut self, upload_id: impl Into<String>, part_count: i64, chunk_size: i64) -> Self {
        self.upload_id = Some(upload_id.into());
        self.part_count = Some(part_count);
        self.chunk_size = Some(chunk_size);
        self
    }
}

#[async_trait]
pub trait MetadataRepository: Send + Sync {
    async fn get(&self, file_id: Uuid) -> RepositoryResult<Option<FileRecord>>;

    /// Insert a new record. Fails with `AlreadyExists` on an id collision.
    async fn put(&self, record: &FileRecord) -> RepositoryResult<()>;

    /// Apply `update` atomically, only if the current status equals
    /// `expected_status` when one is given. A status change requires
    /// `expected_status` and must pass [`FileUpdate::check_transition`].
    async fn update_fields(
        &self,
        file_id: Uuid,
        update: &FileUpdate,
        expected_status: Option<FileStatus>,
    ) -> RepositoryResult<()>;

    async fn delete(&self, file_id: Uuid) -> RepositoryResult<()>;

    /// All records of one owner, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> RepositoryResult<Vec<FileRecord>>;

    /// Records in one of `statuses` last touched before `older_than`, oldest first.
    async fn list_stale(
        &self,
        statuses: &[FileStatus],
        older_than: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Vec<FileRecord>>;

    /// Cheap connectivity check used by readiness.
    async fn ping(&self) -> RepositoryResult<()>;
}
