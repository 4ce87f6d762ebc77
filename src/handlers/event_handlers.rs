//! Object-store notification intake.
//!
//! Accepts S3-style event batches (`{"Records": [{"s3": {"object": {...}}}]}`)
//! and reconciles each created object's size into its file record. A record
//! that cannot be converted or applied is logged and skipped; the rest of the
//! batch still goes through.

use crate::{
    errors::AppError,
    handlers::identity::EventSource,
    services::file_service::ReconcileOutcome,
    state::AppState,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ObjectCreated {
    #[serde(rename = "eventName", default)]
    event_name: Option<String>,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
    size: i64,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventBatchSummary {
    pub processed: usize,
    pub completed: usize,
    pub skipped: usize,
}

/// `POST /events/object-created`, authenticated by the shared events token.
pub async fn object_created(
    State(state): State<AppState>,
    _source: EventSource,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<EventBatchSummary>, AppError> {
    let Json(body) = body
        .map_err(|rejection| AppError::bad_request(format!("invalid event body: {rejection}")))?;
    let records = body
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::bad_request("event body has no Records array"))?;

    let mut summary = EventBatchSummary::default();
    for (index, raw) in records.iter().enumerate() {
        let event = match ObjectCreated::deserialize(raw) {
            Ok(event) => event,
            Err(err) => {
                warn!(index, error = %err, "skipping malformed event record");
                summary.skipped += 1;
                continue;
            }
        };

        if let Some(name) = event.event_name.as_deref() {
            if !name.starts_with("ObjectCreated") {
                debug!(index, event_name = name, "ignoring non-create event");
                summary.skipped += 1;
                continue;
            }
        }

        match state
            .files
            .record_object_created(&event.s3.object.key, event.s3.object.size)
            .await
        {
            Ok(ReconcileOutcome::Skipped) => summary.skipped += 1,
            Ok(ReconcileOutcome::Completed) => {
                summary.processed += 1;
                summary.completed += 1;
            }
            Ok(ReconcileOutcome::SizeUpdated) => summary.processed += 1,
            Err(err) => {
                warn!(index, key = %event.s3.object.key, error = %err, "skipping event record");
                summary.skipped += 1;
            }
        }
    }

    Ok(Json(summary))
}
