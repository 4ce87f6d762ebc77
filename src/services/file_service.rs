//! FileService: the upload-session orchestrator.
//!
//! Owns no state of its own: every request goes through the injected
//! [`MetadataRepository`] and [`ObjectStoreGateway`] handles, which are built
//! once at startup and shared by reference.
//!
//! - `begin_upload` plans the transfer, writes a `Pending` record, and hands
//!   out presigned URL(s).
//! - `complete_upload` validates the part list and finalizes a multipart session.
//! - `delete_file` removes the record, then the object.
//! - `record_object_created` reconciles sizes reported by the object store.

use super::{
    completion::normalize_parts,
    error::{ServiceError, ServiceResult},
    ownership::{OwnedRecord, authorize},
    planner::{UploadLimits, UploadPlan, plan},
};
use crate::{
    config::DownloadPolicy,
    gateway::ObjectStoreGateway,
    models::{
        file::{FileRecord, FileStatus},
        upload::{
            BeginUploadRequest, CompleteUploadRequest, CompletionConfirmation,
            DownloadUrlResponse, UploadPlanResult,
        },
    },
    repository::{FileUpdate, MetadataRepository},
};
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// What `record_object_created` did with one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A single-part upload landed; the record is now `Completed`.
    Completed,
    /// Only the stored size was written.
    SizeUpdated,
    /// No live record matched the key.
    Skipped,
}

#[derive(Clone)]
pub struct FileService {
    pub repo: Arc<dyn MetadataRepository>,
    pub gateway: Arc<dyn ObjectStoreGateway>,
    pub limits: UploadLimits,
    pub download_policy: DownloadPolicy,
}

impl FileService {
    pub fn new(
        repo: Arc<dyn MetadataRepository>,
        gateway: Arc<dyn ObjectStoreGateway>,
        limits: UploadLimits,
        download_policy: DownloadPolicy,
    ) -> Self {
        Self {
            repo,
            gateway,
            limits,
            download_policy,
        }
    }

    /// Fetch a record or fail with `NotFound`.
    async fn resolve(&self, file_id: Uuid) -> ServiceResult<FileRecord> {
        self.repo
            .get(file_id)
            .await?
            .ok_or(ServiceError::NotFound(file_id))
    }

    /// Plan an upload, persist its `Pending` record, and return the URL(s)
    /// the client uploads to.
    ///
    /// Input is validated before anything is written. Once the record exists,
    /// object store failures are surfaced without removing it.
    pub async fn begin_upload(
        &self,
        owner_id: &str,
        req: BeginUploadRequest,
    ) -> ServiceResult<UploadPlanResult> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("name is required"));
        }
        let mime_type = match req.mime_type.trim() {
            "" => DEFAULT_MIME_TYPE,
            mime => mime,
        };

        let upload_plan = plan(&self.limits, req.declared_size, req.chunk_size)?;

        let record =
            FileRecord::new_pending(owner_id, name, mime_type, req.declared_size, Utc::now());
        self.repo.put(&record).await?;
        let key = record.object_key();
        info!(
            file_id = %record.file_id,
            owner_id,
            declared_size = record.declared_size,
            ?upload_plan,
            "created pending file record"
        );

        match upload_plan {
            UploadPlan::Single => {
                let upload_url = self
                    .gateway
                    .presign_put(&key, mime_type, self.limits.single_url_ttl)
                    .await?;
                Ok(UploadPlanResult::Single {
                    upload_url,
                    file_id: record.file_id,
                })
            }
            UploadPlan::Multipart {
                part_count,
                chunk_size,
            } => {
                let upload_id = self
                    .gateway
                    .create_multipart_session(&key, mime_type)
                    .await?;

                let update = FileUpdate::at(Utc::now())
                    .status(FileStatus::Uploading)
                    .session(&upload_id, i64::from(part_count), chunk_size);
                if let Err(err) = self
                    .repo
                    .update_fields(record.file_id, &update, Some(FileStatus::Pending))
                    .await
                {
                    // The record cannot point at this session, so nothing
                    // could ever complete or reclaim it.
                    if let Err(abort_err) = self.gateway.abort_multipart(&key, &upload_id).await {
                        warn!(file_id = %record.file_id, upload_id, error = %abort_err, "failed to abort orphaned multipart session");
                    }
                    return Err(err.into());
                }

                let ttl = self.limits.part_url_ttl;
                let part_urls = try_join_all((1..=part_count).map(|part_number| {
                    self.gateway
                        .presign_upload_part(&key, &upload_id, part_number, ttl)
                }))
                .await?;

                info!(
                    file_id = %record.file_id,
                    upload_id,
                    part_count,
                    "multipart session opened"
                );
                Ok(UploadPlanResult::Multipart {
                    upload_id,
                    file_id: record.file_id,
                    part_urls,
                })
            }
        }
    }

    /// Finalize a multipart session and mark the record `Completed`.
    pub async fn complete_upload(
        &self,
        owner_id: &str,
        req: CompleteUploadRequest,
    ) -> ServiceResult<CompletionConfirmation> {
        let file_id_raw = req.file_id.trim();
        let upload_id = req.upload_id.trim();
        if file_id_raw.is_empty() || upload_id.is_empty() || req.parts.is_empty() {
            return Err(ServiceError::validation(
                "fileID, uploadID and parts are required",
            ));
        }
        let file_id = parse_file_id(file_id_raw)?;

        let record = self.resolve(file_id).await?;
        let owned = authorize(record, owner_id).into_result()?;
        self.ensure_completable(&owned, upload_id)?;

        let parts = normalize_parts(&req.parts, owned.part_count)?;
        let key = owned.object_key();

        self.gateway
            .complete_multipart(&key, upload_id, &parts)
            .await
            .inspect_err(|err| {
                warn!(%file_id, upload_id, error = %err, "multipart completion failed");
            })?;

        self.repo
            .update_fields(
                file_id,
                &FileUpdate::at(Utc::now()).status(FileStatus::Completed),
                Some(FileStatus::Uploading),
            )
            .await?;

        info!(%file_id, upload_id, parts = parts.len(), "upload completed");
        Ok(CompletionConfirmation {
            file_id,
            message: "Upload completed successfully".to_string(),
        })
    }

    fn ensure_completable(&self, record: &OwnedRecord, upload_id: &str) -> ServiceResult<()> {
        match record.status {
            FileStatus::Uploading => {}
            FileStatus::Completed => return Err(ServiceError::AlreadyCompleted(record.file_id)),
            FileStatus::Pending => {
                return Err(ServiceError::InvalidState {
                    file_id: record.file_id,
                    status: record.status,
                    reason: "no multipart session exists for this file".into(),
                });
            }
            FileStatus::Abandoned => {
                return Err(ServiceError::InvalidState {
                    file_id: record.file_id,
                    status: record.status,
                    reason: "the upload session was reclaimed".into(),
                });
            }
        }

        if record.upload_id.as_deref() != Some(upload_id) {
            return Err(ServiceError::validation(
                "uploadID does not match the file's multipart session",
            ));
        }
        Ok(())
    }

    /// Delete the record, then the object.
    ///
    /// An object store failure after the record is gone is returned to the
    /// caller; the record deletion stands.
    pub async fn delete_file(&self, owner_id: &str, file_id: Uuid) -> ServiceResult<()> {
        let record = self.resolve(file_id).await?;
        let owned = authorize(record, owner_id).into_result()?;

        self.repo.delete(file_id).await?;
        info!(%file_id, owner_id, "deleted file record");

        let key = owned.object_key();
        if let (FileStatus::Uploading, Some(upload_id)) = (owned.status, owned.upload_id.as_deref())
        {
            if let Err(err) = self.gateway.abort_multipart(&key, upload_id).await {
                warn!(%file_id, upload_id, error = %err, "failed to abort multipart session");
            }
        }

        self.gateway.delete_object(&key).await.inspect_err(|err| {
            warn!(%file_id, error = %err, "record deleted but object cleanup failed");
        })?;
        debug!(%file_id, "deleted object");
        Ok(())
    }

    /// Apply the configured download policy to a resolved record.
    fn check_read_access(&self, record: FileRecord, caller: Option<&str>) -> ServiceResult<FileRecord> {
        match self.download_policy {
            DownloadPolicy::Public => Ok(record),
            DownloadPolicy::Owner => {
                let caller = caller.ok_or_else(|| {
                    ServiceError::Auth("an authenticated caller is required".into())
                })?;
                Ok(authorize(record, caller).into_result()?.into_inner())
            }
        }
    }

    /// Issue a presigned GET for a file's object.
    pub async fn generate_download_url(
        &self,
        file_id: Uuid,
        caller: Option<&str>,
    ) -> ServiceResult<DownloadUrlResponse> {
        let record = self.resolve(file_id).await?;
        let record = self.check_read_access(record, caller)?;

        let download_url = self
            .gateway
            .presign_get(
                &record.object_key(),
                &record.mime_type,
                self.limits.download_url_ttl,
            )
            .await?;

        Ok(DownloadUrlResponse {
            download_url,
            file_name: record.name,
            content_type: record.mime_type,
        })
    }

    pub async fn get_file(&self, file_id: Uuid, caller: Option<&str>) -> ServiceResult<FileRecord> {
        let record = self.resolve(file_id).await?;
        self.check_read_access(record, caller)
    }

    pub async fn list_files(&self, owner_id: &str) -> ServiceResult<Vec<FileRecord>> {
        Ok(self.repo.list_by_owner(owner_id).await?)
    }

    /// Reconcile the stored size of an object the object store reports as created.
    pub async fn record_object_created(
        &self,
        key: &str,
        size: i64,
    ) -> ServiceResult<ReconcileOutcome> {
        let file_id = parse_file_id(key)?;
        if size < 0 {
            return Err(ServiceError::Validation(format!(
                "object `{key}` reported a negative size"
            )));
        }

        let Some(record) = self.repo.get(file_id).await? else {
            debug!(%file_id, "object created for unknown file");
            return Ok(ReconcileOutcome::Skipped);
        };

        let update = FileUpdate::at(Utc::now()).declared_size(size);
        let (update, outcome) = match record.status {
            FileStatus::Pending => (
                update.status(FileStatus::Completed),
                ReconcileOutcome::Completed,
            ),
            FileStatus::Uploading | FileStatus::Completed => (update, ReconcileOutcome::SizeUpdated),
            FileStatus::Abandoned => {
                debug!(%file_id, "object created for abandoned file");
                return Ok(ReconcileOutcome::Skipped);
            }
        };

        self.repo
            .update_fields(file_id, &update, Some(record.status))
            .await?;
        info!(%file_id, size, ?outcome, "reconciled object size");
        Ok(outcome)
    }
}

fn parse_file_id(raw: &str) -> ServiceResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ServiceError::Validation(format!("`{raw}` is not a valid fileID")))
}
