//! Part-list validation for multipart completion.
//!
//! Client ordering is not trusted: parts are checked and sorted here before
//! anything reaches the object store.

use super::error::{ServiceError, ServiceResult};
use crate::{gateway::CompletedPart, models::upload::PartCompletion};
use std::collections::HashSet;

/// Validate the submitted parts and return them in ascending part order.
///
/// Part numbers must be unique and cover `1..=n` once sorted; `expected_parts`
/// caps the highest accepted part number when the session's size is known.
pub fn normalize_parts(
    parts: &[PartCompletion],
    expected_parts: Option<i64>,
) -> ServiceResult<Vec<CompletedPart>> {
    if parts.is_empty() {
        return Err(ServiceError::validation("parts must not be empty"));
    }

    let mut seen = HashSet::with_capacity(parts.len());
    for part in parts {
        if part.part_number < 1 {
            return Err(ServiceError::Validation(format!(
                "part number {} is out of range",
                part.part_number
            )));
        }
        if part.e_tag.trim().is_empty() {
            return Err(ServiceError::Validation(format!(
                "part {} is missing its eTag",
                part.part_number
            )));
        }
        if !seen.insert(part.part_number) {
            return Err(ServiceError::Validation(format!(
                "part {} submitted more than once",
                part.part_number
            )));
        }
    }

    let mut sorted = parts
        .iter()
        .map(|part| CompletedPart {
            part_number: part.part_number,
            e_tag: part.e_tag.clone(),
        })
        .collect::<Vec<_>>();
    sorted.sort_by_key(|part| part.part_number);

    for (index, part) in sorted.iter().enumerate() {
        if part.part_number as usize != index + 1 {
            return Err(ServiceError::Validation(format!(
                "part {} is missing",
                index + 1
            )));
        }
    }

    if let Some(expected) = expected_parts {
        if sorted.len() as i64 > expected {
            return Err(ServiceError::Validation(format!(
                "{} parts submitted but the session was planned with {}",
                sorted.len(),
                expected
            )));
        }
    }

    Ok(sorted)
}
