//! Single-record creation with property-removal retry.
//!
//! HubSpot validation errors identify at most one bad field per response.
//! Rather than failing a whole row for one bad custom field, each failed
//! create is inspected for the offending property name and retried with that
//! property removed. Properties are only ever removed, never added, so every
//! retry sends a strict subset of the previous attempt.

use tracing::debug;

use crate::error::AppError;
use crate::hubspot::error_body::extract_invalid_property;
use crate::import::{PropertySet, RecordCreator, RowStatus};

/// Creates one record, shedding invalid properties one at a time.
///
/// At most `initial.len() + 1` attempts are made. A property is shed only
/// when the error names it, it is still present, and more than one property
/// remains; the last property is never removed. Returns `Created` on a
/// clean first success, `Warning` with the shed field names on a salvaged
/// success, and `Failed` otherwise.
pub async fn create_with_retry(creator: &dyn RecordCreator, initial: &PropertySet) -> RowStatus {
    let mut remaining = initial.clone();
    let mut skipped: Vec<String> = Vec::new();
    let attempts_allowed = initial.len() + 1;

    for _ in 0..attempts_allowed {
        match creator.create_one(&remaining).await {
            Ok(record) => {
                return if skipped.is_empty() {
                    RowStatus::Created { id: record.id }
                } else {
                    RowStatus::Warning {
                        id: record.id,
                        skipped_fields: skipped,
                    }
                };
            }
            Err(err) => match invalid_property_of(&err) {
                Some(name) if remaining.contains_key(&name) && remaining.len() > 1 => {
                    debug!("shedding invalid property {:?} and retrying", name);
                    remaining.remove(&name);
                    skipped.push(name);
                }
                _ => {
                    return RowStatus::Failed {
                        error: err.row_message(),
                    };
                }
            },
        }
    }

    RowStatus::Failed {
        error: "Exceeded property-removal retries".to_string(),
    }
}

/// Best-effort extraction of the invalid property named by an error.
fn invalid_property_of(err: &AppError) -> Option<String> {
    match err {
        AppError::HubSpot {
            body: Some(body), ..
        } => extract_invalid_property(body),
        AppError::HubSpot {
            message,
            body: None,
        } => extract_invalid_property(message),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
