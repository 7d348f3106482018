//! Concurrent batch scheduling and outcome aggregation.
//!
//! The full input set is partitioned into consecutive batches of at most 100
//! property sets, each tagged with its starting row-index offset. At most
//! [`CONCURRENCY`] batches are in flight at once, gated by an
//! [`ImportScheduler`] permit. As each batch completes its outcomes fold
//! into the shared [`RunSummary`] and the progress callback fires with a
//! fresh snapshot.
//!
//! Batches complete in non-deterministic order relative to each other;
//! outcome attribution relies on row indices, never arrival order. There is
//! no mid-run cancellation: once started, every partitioned batch runs.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::info;

use crate::error::AppError;
use crate::import::batch::submit_batch;
use crate::import::{map_row, PropertySet, RawRow, RecordCreator, RowOutcome, RowStatus};
use crate::import::{RunState, RunSummary};

/// Maximum property sets per batch call.
pub const BATCH_SIZE: usize = 100;

/// Maximum batches in flight at once.
pub const CONCURRENCY: usize = 6;

/// Progress observer invoked with a snapshot after every completed batch.
/// Must be cheap and non-blocking.
pub type ProgressFn = dyn Fn(&RunSummary) + Send + Sync;

// ─────────────────────────────────────────────────────────────────────────────
// ImportScheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Gate limiting the number of concurrently in-flight batches.
///
/// Uses a semaphore to enforce the concurrency limit. Permits are
/// automatically released when dropped, ensuring slots are always freed.
#[derive(Clone)]
pub struct ImportScheduler {
    /// The underlying semaphore for concurrency control.
    sem: Arc<Semaphore>,
    /// Maximum number of in-flight batches allowed.
    max: usize,
}

impl ImportScheduler {
    /// Creates a new scheduler with the specified in-flight batch limit.
    ///
    /// # Panics
    ///
    /// Panics if `max_in_flight` is 0.
    pub fn new(max_in_flight: usize) -> Self {
        assert!(max_in_flight > 0, "max_in_flight must be greater than 0");

        Self {
            sem: Arc::new(Semaphore::new(max_in_flight)),
            max: max_in_flight,
        }
    }

    /// Acquires a permit, waiting if all slots are currently in use.
    ///
    /// The permit is automatically released when dropped.
    pub async fn acquire(&self) -> BatchPermit {
        // We never close the semaphore, so acquire_owned cannot fail
        let permit = self
            .sem
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore closed unexpectedly");

        BatchPermit { permit }
    }

    /// Attempts to acquire a permit without waiting.
    pub fn try_acquire(&self) -> Option<BatchPermit> {
        self.sem
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| BatchPermit { permit })
    }

    /// Returns the number of batches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.max - self.sem.available_permits()
    }

    /// Returns the number of available slots for new batches.
    pub fn available_slots(&self) -> usize {
        self.sem.available_permits()
    }
}

/// A permit representing one in-flight batch slot.
///
/// The slot is released when this permit is dropped.
pub struct BatchPermit {
    #[allow(dead_code)]
    permit: OwnedSemaphorePermit,
}

// ─────────────────────────────────────────────────────────────────────────────
// Run
// ─────────────────────────────────────────────────────────────────────────────

/// One partitioned chunk of the input, tagged with its starting row index.
struct Batch {
    start_index: usize,
    items: Vec<PropertySet>,
}

/// Maps raw rows and runs the full import.
///
/// # Errors
///
/// Returns `AppError::SourceEmpty` if there are no data rows. Once uploading
/// begins the run always completes; per-row failures surface as outcomes in
/// the returned summary, never as errors.
pub async fn import_rows(
    rows: &[RawRow],
    creator: Arc<dyn RecordCreator>,
    on_progress: Arc<ProgressFn>,
) -> Result<RunSummary, AppError> {
    if rows.is_empty() {
        return Err(AppError::SourceEmpty);
    }
    let items: Vec<PropertySet> = rows.iter().map(map_row).collect();
    Ok(run_import(items, creator, on_progress).await)
}

/// Runs the import over pre-mapped property sets.
///
/// Partitions `items` into batches of at most [`BATCH_SIZE`], submits up to
/// [`CONCURRENCY`] batches concurrently, and resolves when every batch has
/// completed (a join barrier over all batch tasks). The returned summary is
/// in the `Done` state and contains exactly one outcome-derived entry per
/// warned or failed row.
pub async fn run_import(
    items: Vec<PropertySet>,
    creator: Arc<dyn RecordCreator>,
    on_progress: Arc<ProgressFn>,
) -> RunSummary {
    let total = items.len();
    let batches = partition(items);

    info!(
        "starting import: {} rows in {} batches (concurrency {})",
        total,
        batches.len(),
        CONCURRENCY
    );

    let scheduler = ImportScheduler::new(CONCURRENCY);
    let summary = Arc::new(Mutex::new(RunSummary::new(total)));

    let mut handles = Vec::with_capacity(batches.len());
    for batch in batches {
        let scheduler = scheduler.clone();
        let creator = Arc::clone(&creator);
        let summary = Arc::clone(&summary);
        let on_progress = Arc::clone(&on_progress);

        handles.push(tokio::spawn(async move {
            let _permit = scheduler.acquire().await;
            let outcomes = run_batch(creator.as_ref(), &batch).await;

            // Aggregation and the progress callback share one critical
            // section so snapshots are never torn.
            let mut summary = summary.lock().await;
            summary.record_batch(&outcomes);
            on_progress(&summary);
        }));
    }

    for handle in handles {
        handle.await.expect("import batch task panicked");
    }

    let mut summary = summary.lock().await;
    summary.state = RunState::Done;
    on_progress(&summary);

    info!("import done: {}", summary.summary_line());
    summary.clone()
}

/// Submits one batch and re-bases its outcomes onto the full input sequence.
async fn run_batch(creator: &dyn RecordCreator, batch: &Batch) -> Vec<RowOutcome> {
    match submit_batch(creator, &batch.items).await {
        Ok(outcomes) => outcomes
            .into_iter()
            .map(|outcome| RowOutcome {
                index: batch.start_index + outcome.index,
                status: outcome.status,
            })
            .collect(),
        // Unreachable with BATCH_SIZE-bounded partitions; if it ever fires,
        // every row in the batch is attributed the error rather than dropped.
        Err(err) => {
            let message = err.row_message();
            (0..batch.items.len())
                .map(|j| RowOutcome {
                    index: batch.start_index + j,
                    status: RowStatus::Failed {
                        error: message.clone(),
                    },
                })
                .collect()
        }
    }
}

/// Partitions items into consecutive batches of at most [`BATCH_SIZE`],
/// recording each batch's starting row-index offset.
fn partition(items: Vec<PropertySet>) -> Vec<Batch> {
    let mut batches = Vec::with_capacity(items.len().div_ceil(BATCH_SIZE));
    let mut start_index = 0;
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let chunk: Vec<PropertySet> = items.by_ref().take(BATCH_SIZE).collect();
        let len = chunk.len();
        batches.push(Batch {
            start_index,
            items: chunk,
        });
        start_index += len;
    }

    batches
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
