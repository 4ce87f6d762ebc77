//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use upload_orchestrator::{
    config::DownloadPolicy,
    gateway::{CompletedPart, GatewayError, GatewayResult, ObjectStoreGateway},
    models::file::{FileRecord, FileStatus},
    repository::{FileUpdate, MetadataRepository, RepositoryError, RepositoryResult},
    services::{FileService, planner::UploadLimits},
    state::AppState,
};
use uuid::Uuid;

pub const OWNER: &str = "user-1";
pub const OTHER: &str = "user-2";
pub const IDENTITY_HEADER: &str = "x-owner-id";
pub const EVENTS_TOKEN: &str = "notify-secret";

#[derive(Default)]
pub struct MemoryMetadataRepository {
    records: Mutex<HashMap<Uuid, FileRecord>>,
    fail_updates: Mutex<bool>,
}

impl MemoryMetadataRepository {
    pub fn snapshot(&self, file_id: Uuid) -> Option<FileRecord> {
        self.records.lock().unwrap().get(&file_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Insert or replace a record without any checks.
    pub fn seed(&self, record: FileRecord) {
        self.records.lock().unwrap().insert(record.file_id, record);
    }

    pub fn fail_updates(&self) {
        *self.fail_updates.lock().unwrap() = true;
    }
}

#[async_trait]
impl MetadataRepository for MemoryMetadataRepository {
    async fn get(&self, file_id: Uuid) -> RepositoryResult<Option<FileRecord>> {
        Ok(self.snapshot(file_id))
    }

    async fn put(&self, record: &FileRecord) -> RepositoryResult<()> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.file_id) {
            return Err(RepositoryError::AlreadyExists(record.file_id));
        }
        records.insert(record.file_id, record.clone());
        Ok(())
    }

    async fn update_fields(
        &self,
        file_id: Uuid,
        update: &FileUpdate,
        expected_status: Option<FileStatus>,
    ) -> RepositoryResult<()> {
        if *self.fail_updates.lock().unwrap() {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        update.check_transition(file_id, expected_status)?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&file_id)
            .ok_or(RepositoryError::NotFound(file_id))?;
        if let Some(expected) = expected_status {
            if record.status != expected {
                return Err(RepositoryError::Conflict { file_id, expected });
            }
        }
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(size) = update.declared_size {
            record.declared_size = size;
        }
        if let Some(upload_id) = &update.upload_id {
            record.upload_id = Some(upload_id.clone());
        }
        if let Some(part_count) = update.part_count {
            record.part_count = Some(part_count);
        }
        if let Some(chunk_size) = update.chunk_size {
            record.chunk_size = Some(chunk_size);
        }
        record.updated_at = update.updated_at;
        Ok(())
    }

    async fn delete(&self, file_id: Uuid) -> RepositoryResult<()> {
        self.records
            .lock()
            .unwrap()
            .remove(&file_id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(file_id))
    }

    async fn list_by_owner(&self, owner_id: &str) -> RepositoryResult<Vec<FileRecord>> {
        let mut rows: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_stale(
        &self,
        statuses: &[FileStatus],
        older_than: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Vec<FileRecord>> {
        let mut rows: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| statuses.contains(&r.status) && r.updated_at < older_than)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

/// Calls observed by [`MockGateway`].
#[derive(Debug, Default, Clone)]
pub struct GatewayCalls {
    pub presigned_puts: Vec<String>,
    pub presigned_gets: Vec<String>,
    pub sessions_created: Vec<String>,
    pub presigned_parts: Vec<(String, i32)>,
    pub completed: Vec<(String, String, Vec<CompletedPart>)>,
    pub aborted: Vec<(String, String)>,
    pub deleted: Vec<String>,
}

impl GatewayCalls {
    pub fn presign_count(&self) -> usize {
        self.presigned_puts.len() + self.presigned_gets.len() + self.presigned_parts.len()
    }
}

/// Which gateway call should fail, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayFailure {
    CreateSession,
    Complete,
    Delete,
    SessionGone,
}

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<GatewayCalls>,
    failure: Mutex<Option<GatewayFailure>>,
    after_complete: Mutex<Option<Hook>>,
}

impl MockGateway {
    pub fn calls(&self) -> GatewayCalls {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_with(&self, failure: GatewayFailure) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    /// Run `hook` right after a multipart completion succeeds.
    pub fn after_complete(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.after_complete.lock().unwrap() = Some(Box::new(hook));
    }

    fn failure(&self) -> Option<GatewayFailure> {
        *self.failure.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStoreGateway for MockGateway {
    async fn presign_put(&self, key: &str, _content_type: &str, ttl: Duration) -> GatewayResult<String> {
        self.calls.lock().unwrap().presigned_puts.push(key.to_string());
        Ok(format!("https://store.test/{key}?op=put&ttl={}", ttl.as_secs()))
    }

    async fn presign_get(&self, key: &str, _content_type: &str, ttl: Duration) -> GatewayResult<String> {
        self.calls.lock().unwrap().presigned_gets.push(key.to_string());
        Ok(format!("https://store.test/{key}?op=get&ttl={}", ttl.as_secs()))
    }

    async fn create_multipart_session(&self, key: &str, _content_type: &str) -> GatewayResult<String> {
        if self.failure() == Some(GatewayFailure::CreateSession) {
            return Err(GatewayError::Service("connection reset".into()));
        }
        self.calls.lock().unwrap().sessions_created.push(key.to_string());
        Ok(format!("upload-{key}"))
    }

    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        _ttl: Duration,
    ) -> GatewayResult<String> {
        self.calls
            .lock()
            .unwrap()
            .presigned_parts
            .push((key.to_string(), part_number));
        Ok(format!(
            "https://store.test/{key}?uploadId={upload_id}&partNumber={part_number}"
        ))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> GatewayResult<()> {
        match self.failure() {
            Some(GatewayFailure::Complete) => {
                return Err(GatewayError::Service("internal error".into()));
            }
            Some(GatewayFailure::SessionGone) => {
                return Err(GatewayError::SessionNotFound {
                    upload_id: upload_id.to_string(),
                });
            }
            _ => {}
        }
        self.calls.lock().unwrap().completed.push((
            key.to_string(),
            upload_id.to_string(),
            parts.to_vec(),
        ));
        if let Some(hook) = self.after_complete.lock().unwrap().as_ref() {
            hook();
        }
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> GatewayResult<()> {
        self.calls
            .lock()
            .unwrap()
            .aborted
            .push((key.to_string(), upload_id.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> GatewayResult<()> {
        if self.failure() == Some(GatewayFailure::Delete) {
            return Err(GatewayError::Service("access denied".into()));
        }
        self.calls.lock().unwrap().deleted.push(key.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub repo: Arc<MemoryMetadataRepository>,
    pub gateway: Arc<MockGateway>,
    pub service: FileService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(DownloadPolicy::Owner)
    }

    pub fn with_policy(policy: DownloadPolicy) -> Self {
        Self::build(UploadLimits::default(), policy)
    }

    pub fn with_limits(limits: UploadLimits) -> Self {
        Self::build(limits, DownloadPolicy::Owner)
    }

    fn build(limits: UploadLimits, policy: DownloadPolicy) -> Self {
        let repo = Arc::new(MemoryMetadataRepository::default());
        let gateway = Arc::new(MockGateway::default());
        let service = FileService::new(repo.clone(), gateway.clone(), limits, policy);
        Self {
            repo,
            gateway,
            service,
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.service.clone(), IDENTITY_HEADER).with_events_token(Some(EVENTS_TOKEN))
    }
}
