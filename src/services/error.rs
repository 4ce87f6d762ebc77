//! Failure taxonomy of the orchestration core.

use crate::{
    gateway::GatewayError,
    repository::RepositoryError,
};
use thiserror::Error;
use uuid::Uuid;

/// Which collaborator an upstream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    MetadataRepository,
    ObjectStore,
}

impl std::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collaborator::MetadataRepository => f.write_str("metadata repository"),
            Collaborator::ObjectStore => f.write_str("object store"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("caller does not own file `{file_id}`")]
    Ownership { file_id: Uuid },
    #[error("file `{0}` not found")]
    NotFound(Uuid),
    #[error("upload would need {part_count} parts, more than the maximum of {max_parts}")]
    PartLimitExceeded { part_count: u64, max_parts: u64 },
    #[error("upload for file `{0}` is already completed")]
    AlreadyCompleted(Uuid),
    #[error("file `{file_id}` is {status}: {reason}")]
    InvalidState {
        file_id: Uuid,
        status: crate::models::file::FileStatus,
        reason: String,
    },
    #[error("file `{0}` was modified concurrently")]
    Conflict(Uuid),
    #[error("{collaborator} call failed: {message}")]
    Upstream {
        collaborator: Collaborator,
        message: String,
        /// The client may recover by retrying or restarting the upload.
        retryable: bool,
    },
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        ServiceError::Upstream {
            collaborator: Collaborator::ObjectStore,
            retryable: err.is_client_retryable(),
            message: err.to_string(),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(file_id) => ServiceError::NotFound(file_id),
            RepositoryError::Conflict { file_id, .. }
            | RepositoryError::IllegalTransition { file_id, .. } => ServiceError::Conflict(file_id),
            other => ServiceError::Upstream {
                collaborator: Collaborator::MetadataRepository,
                message: other.to_string(),
                retryable: false,
            },
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
