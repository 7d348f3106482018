//! The bulk batch-import pipeline.
//!
//! Raw rows from a CSV file or a Google Sheet flow through the stages below:
//!
//! 1. [`mapper`] turns each row into a HubSpot property set.
//! 2. [`scheduler`] partitions the property sets into batches of up to 100
//!    and runs a bounded number of batches concurrently.
//! 3. [`batch`] submits one batch; on any batch-level failure it degrades to
//!    per-item creates through [`retry`], which sheds invalid properties one
//!    at a time to salvage the record.
//! 4. [`outcome`] accumulates one terminal outcome per input row and exposes
//!    live progress snapshots.
//!
//! Per-row failures never abort a run: once uploading starts, every batch is
//! attempted and the run always reaches `Done`. Only a source-read failure
//! (unreadable or empty CSV/sheet) is fatal.

pub mod batch;
pub mod mapper;
pub mod outcome;
pub mod retry;
pub mod scheduler;
pub mod source;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use batch::submit_batch;
pub use mapper::map_row;
pub use outcome::{RowIssue, RowOutcome, RowStatus, RunState, RunSummary};
pub use retry::create_with_retry;
pub use scheduler::{import_rows, run_import, ImportScheduler, ProgressFn, BATCH_SIZE, CONCURRENCY};
pub use source::RawRow;

/// The target schema's field-name-to-value mapping for one record.
///
/// Property names are schema-driven and open-ended, so this is a plain
/// ordered string map rather than a typed struct.
pub type PropertySet = BTreeMap<String, String>;

/// A record successfully created in the remote CRM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    /// Identifier assigned by the remote API.
    pub id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// RecordCreator
// ─────────────────────────────────────────────────────────────────────────────

/// The pipeline's seam to the remote create operations.
///
/// This trait decouples the retry/batch/scheduler stages from the actual
/// HubSpot client. The orchestration layer implements it for a real object
/// endpoint, and tests provide fake implementations.
pub trait RecordCreator: Send + Sync {
    /// Creates a single record from a property set.
    fn create_one<'a>(
        &'a self,
        properties: &'a PropertySet,
    ) -> Pin<Box<dyn Future<Output = Result<CreatedRecord, AppError>> + Send + 'a>>;

    /// Creates up to 100 records in one call.
    ///
    /// A failure here means the entire batch failed atomically; no partial
    /// success is assumed from this call.
    fn batch_create<'a>(
        &'a self,
        items: &'a [PropertySet],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CreatedRecord>, AppError>> + Send + 'a>>;
}
