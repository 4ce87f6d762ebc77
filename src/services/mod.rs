//! Orchestration core: planning, session management, completion,
//! ownership checks, and reclamation of stale sessions.

pub mod completion;
pub mod error;
pub mod file_service;
pub mod ownership;
pub mod planner;
pub mod sweeper;

pub use error::{ServiceError, ServiceResult};
pub use file_service::FileService;
