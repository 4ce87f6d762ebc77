//! Upload orchestrator: presigned single-part and multipart uploads to an
//! S3-compatible object store, with file metadata kept in SQLite.

pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use state::AppState;

/// Build the application router with its state attached.
pub fn app(state: AppState) -> Router {
    routes::routes::routes().with_state(state)
}
