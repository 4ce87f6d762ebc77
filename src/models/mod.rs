//! Core data models for the upload orchestrator.
//!
//! `file` holds the persisted record and its status machine; `upload` holds
//! the JSON bodies exchanged with clients. Records map to the `files` table via
//! `sqlx::FromRow` and serialize as JSON via `serde`.

pub mod file;
pub mod upload;
