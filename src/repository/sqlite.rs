//! SQLite-backed Metadata Repository.
//!
//! Conditional writes are single `UPDATE ... WHERE status = ?` statements so
//! concurrent requests on the same file race inside SQLite, not in process.

use super::{FileUpdate, MetadataRepository, RepositoryError, RepositoryResult};
use crate::models::file::{FileRecord, FileStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const FILE_COLUMNS: &str = "file_id, owner_id, name, declared_size, mime_type, status, \
     upload_id, part_count, chunk_size, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteMetadataRepository {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteMetadataRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    async fn status_of(&self, file_id: Uuid) -> RepositoryResult<Option<FileStatus>> {
        let status = sqlx::query_scalar::<_, FileStatus>("SELECT status FROM files WHERE file_id = ?")
            .bind(file_id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(status)
    }
}

#[async_trait]
impl MetadataRepository for SqliteMetadataRepository {
    async fn get(&self, file_id: Uuid) -> RepositoryResult<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE file_id = ?"
        ))
        .bind(file_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(record)
    }

    async fn put(&self, record: &FileRecord) -> RepositoryResult<()> {
        let result = sqlx::query(&format!(
            "INSERT INTO files ({FILE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(record.file_id)
        .bind(&record.owner_id)
        .bind(&record.name)
        .bind(record.declared_size)
        .bind(&record.mime_type)
        .bind(record.status)
        .bind(&record.upload_id)
        .bind(record.part_count)
        .bind(record.chunk_size)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&*self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(RepositoryError::AlreadyExists(record.file_id))
            }
            Err(err) => Err(RepositoryError::Database(err)),
        }
    }

    async fn update_fields(
        &self,
        file_id: Uuid,
        update: &FileUpdate,
        expected_status: Option<FileStatus>,
    ) -> RepositoryResult<()> {
        update.check_transition(file_id, expected_status)?;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE files SET updated_at = ");
        builder.push_bind(update.updated_at);
        if let Some(status) = update.status {
            builder.push(", status = ");
            builder.push_bind(status);
        }
        if let Some(size) = update.declared_size {
            builder.push(", declared_size = ");
            builder.push_bind(size);
        }
        if let Some(upload_id) = &update.upload_id {
            builder.push(", upload_id = ");
            builder.push_bind(upload_id.clone());
        }
        if let Some(part_count) = update.part_count {
            builder.push(", part_count = ");
            builder.push_bind(part_count);
        }
        if let Some(chunk_size) = update.chunk_size {
            builder.push(", chunk_size = ");
            builder.push_bind(chunk_size);
        }
        builder.push(" WHERE file_id = ");
        builder.push_bind(file_id);
        if let Some(expected) = expected_status {
            builder.push(" AND status = ");
            builder.push_bind(expected);
        }

        let result = builder.build().execute(&*self.db).await?;
        if result.rows_affected() > 0 {
            debug!(%file_id, ?update, "updated file record");
            return Ok(());
        }

        // Nothing matched: tell a missing row apart from a lost status race.
        match (self.status_of(file_id).await?, expected_status) {
            (None, _) => Err(RepositoryError::NotFound(file_id)),
            (Some(_), Some(expected)) => Err(RepositoryError::Conflict { file_id, expected }),
            (Some(_), None) => Err(RepositoryError::NotFound(file_id)),
        }
    }

    async fn delete(&self, file_id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM files WHERE file_id = ?")
            .bind(file_id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(file_id));
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> RepositoryResult<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = ? ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    async fn list_stale(
        &self,
        statuses: &[FileStatus],
        older_than: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Vec<FileRecord>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE status IN ("
        ));
        let mut separated = builder.separated(", ");
        for status in statuses {
            separated.push_bind(*status);
        }
        separated.push_unseparated(") AND updated_at < ");
        builder.push_bind(older_than);
        builder.push(" ORDER BY updated_at ASC LIMIT ");
        builder.push_bind(limit as i64);

        let rows = builder
            .build_query_as::<FileRecord>()
            .fetch_all(&*self.db)
            .await?;
        Ok(rows)
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
