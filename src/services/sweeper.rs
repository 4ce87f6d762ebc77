//! Reclaims upload sessions that never completed.
//!
//! Records left `Pending` or `Uploading` longer than the stale age are moved
//! to `Abandoned`; any multipart session they point at is aborted first.

use crate::{
    gateway::ObjectStoreGateway,
    models::file::FileStatus,
    repository::{FileUpdate, MetadataRepository, RepositoryError, RepositoryResult},
};
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{debug, info, warn};

const SWEEP_BATCH: usize = 500;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub abandoned: usize,
    /// Records that changed state between listing and the conditional write.
    pub raced: usize,
}

pub struct Sweeper {
    repo: Arc<dyn MetadataRepository>,
    gateway: Arc<dyn ObjectStoreGateway>,
    stale_after: chrono::Duration,
}

impl Sweeper {
    pub fn new(
        repo: Arc<dyn MetadataRepository>,
        gateway: Arc<dyn ObjectStoreGateway>,
        stale_after: chrono::Duration,
    ) -> Self {
        Self {
            repo,
            gateway,
            stale_after,
        }
    }

    /// One pass over records untouched since `now - stale_after`.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> RepositoryResult<SweepReport> {
        let cutoff = now - self.stale_after;
        let stale = self
            .repo
            .list_stale(
                &[FileStatus::Pending, FileStatus::Uploading],
                cutoff,
                SWEEP_BATCH,
            )
            .await?;

        let mut report = SweepReport::default();
        for record in stale {
            if let (FileStatus::Uploading, Some(upload_id)) =
                (record.status, record.upload_id.as_deref())
            {
                if let Err(err) = self
                    .gateway
                    .abort_multipart(&record.object_key(), upload_id)
                    .await
                {
                    warn!(file_id = %record.file_id, upload_id, error = %err, "abort during sweep failed");
                }
            }

            let update = FileUpdate::at(now).status(FileStatus::Abandoned);
            match self
                .repo
                .update_fields(record.file_id, &update, Some(record.status))
                .await
            {
                Ok(()) => {
                    debug!(file_id = %record.file_id, from = %record.status, "abandoned stale upload");
                    report.abandoned += 1;
                }
                Err(RepositoryError::Conflict { .. } | RepositoryError::NotFound(_)) => {
                    report.raced += 1;
                }
                Err(err) => return Err(err),
            }
        }

        if report.abandoned > 0 || report.raced > 0 {
            info!(abandoned = report.abandoned, raced = report.raced, "sweep finished");
        }
        Ok(report)
    }

    /// Sweep every `interval` until `shutdown` flips to true.
    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep_once(Utc::now()).await {
                        warn!(error = %err, "sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("sweeper stopping");
                        break;
                    }
                }
            }
        }
    }
}
