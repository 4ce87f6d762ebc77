//! Defines routes for the upload orchestrator.
//!
//! ## Structure
//! - **Upload lifecycle**
//!   - `POST   /uploads`           - plan an upload, get presigned URL(s)
//!   - `POST   /uploads/complete`  - finalize a multipart upload
//!
//! - **File management**
//!   - `GET    /files`             - list the caller's files
//!   - `GET    /files/{fileId}`    - file metadata
//!   - `DELETE /files/{fileId}`    - delete record and object
//!   - `GET    /downloads?fileID=` - presigned download URL
//!
//! - **Collaborator intake**
//!   - `POST   /events/object-created` - object-store notifications

use crate::{
    handlers::{
        event_handlers::object_created,
        file_handlers::{
            begin_upload, complete_upload, delete_file, download_url, get_file, list_files,
        },
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all orchestrator routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Upload lifecycle
        .route("/uploads", post(begin_upload))
        .route("/uploads/complete", post(complete_upload))
        // File management
        .route("/files", get(list_files))
        .route("/files/{file_id}", get(get_file).delete(delete_file))
        .route("/downloads", get(download_url))
        // Collaborator intake
        .route("/events/object-created", post(object_created))
}
