//! Ownership Guard.
//!
//! Mutating operations take an [`OwnedRecord`], which can only be obtained
//! from [`authorize`] returning [`Decision::Allowed`]. Skipping the check is a
//! type error, not a forgotten `if`.

use super::error::ServiceError;
use crate::models::file::FileRecord;
use std::ops::Deref;
use tracing::warn;

/// A record proven to belong to the caller.
#[derive(Debug, Clone)]
pub struct OwnedRecord(FileRecord);

impl OwnedRecord {
    pub fn into_inner(self) -> FileRecord {
        self.0
    }
}

impl Deref for OwnedRecord {
    type Target = FileRecord;

    fn deref(&self) -> &FileRecord {
        &self.0
    }
}

#[must_use]
#[derive(Debug)]
pub enum Decision {
    Allowed(OwnedRecord),
    Denied(FileRecord),
}

impl Decision {
    /// Turn a denial into an `Ownership` failure.
    pub fn into_result(self) -> Result<OwnedRecord, ServiceError> {
        match self {
            Decision::Allowed(owned) => Ok(owned),
            Decision::Denied(record) => Err(ServiceError::Ownership {
                file_id: record.file_id,
            }),
        }
    }
}

/// Compare the record's owner to the caller's subject.
pub fn authorize(record: FileRecord, caller_owner_id: &str) -> Decision {
    if record.owner_id == caller_owner_id {
        Decision::Allowed(OwnedRecord(record))
    } else {
        warn!(
            file_id = %record.file_id,
            caller = caller_owner_id,
            "ownership check denied"
        );
        Decision::Denied(record)
    }
}
