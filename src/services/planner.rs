//! Upload Planner: chooses single-part or multipart transfer.
//!
//! Pure and deterministic; no collaborator is touched here.

use super::error::{ServiceError, ServiceResult};
use std::time::Duration;

pub const MIB: u64 = 1024 * 1024;
pub const TIB: u64 = 1024 * 1024 * MIB;

/// Part numbers travel as `i32` on the object store wire.
const MAX_PART_NUMBER: u64 = i32::MAX as u64;

/// Numeric limits and presign lifetimes used by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadLimits {
    /// Declared sizes at or above this use multipart.
    pub multipart_threshold: u64,
    /// Upper bound on parts per multipart session.
    pub max_parts: u64,
    /// Largest declared size accepted at all.
    pub max_file_size: u64,
    pub single_url_ttl: Duration,
    pub part_url_ttl: Duration,
    pub download_url_ttl: Duration,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            multipart_threshold: 100 * MIB,
            max_parts: 10_000,
            max_file_size: TIB,
            single_url_ttl: Duration::from_secs(15 * 60),
            part_url_ttl: Duration::from_secs(24 * 60 * 60),
            download_url_ttl: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPlan {
    Single,
    Multipart { part_count: i32, chunk_size: i64 },
}

/// Decide how a file of `declared_size` bytes is transferred.
///
/// `chunk_size` is only consulted for multipart plans, where it is mandatory.
pub fn plan(
    limits: &UploadLimits,
    declared_size: i64,
    chunk_size: Option<i64>,
) -> ServiceResult<UploadPlan> {
    let size = u64::try_from(declared_size)
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| ServiceError::validation("declaredSize must be a positive byte count"))?;

    if size > limits.max_file_size {
        return Err(ServiceError::Validation(format!(
            "declaredSize {} exceeds the maximum of {} bytes",
            size, limits.max_file_size
        )));
    }

    if size < limits.multipart_threshold {
        return Ok(UploadPlan::Single);
    }

    let chunk_size = chunk_size
        .filter(|chunk| *chunk > 0)
        .ok_or_else(|| ServiceError::validation("chunkSize is required for multipart uploads"))?;

    let part_count = size.div_ceil(chunk_size.unsigned_abs());
    let too_many = || ServiceError::PartLimitExceeded {
        part_count,
        max_parts: limits.max_parts.min(MAX_PART_NUMBER),
    };
    if part_count > limits.max_parts {
        return Err(too_many());
    }
    let part_count = i32::try_from(part_count).map_err(|_| too_many())?;

    Ok(UploadPlan::Multipart {
        part_count,
        chunk_size,
    })
}
