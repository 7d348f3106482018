//! Per-row outcomes and the live run summary.
//!
//! Every input row ends the run with exactly one [`RowOutcome`]. Outcomes are
//! attributed by original row index, never by arrival order, since batches
//! complete in non-deterministic order relative to each other. The
//! user-facing row number is `index + 2` (one for 1-based spreadsheet
//! counting, one for the header row).

use serde::Serialize;

/// Lifecycle of one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Parsing,
    Uploading,
    Done,
    Error,
}

/// Terminal status of one input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowStatus {
    /// Created cleanly.
    Created { id: String },
    /// Created after shedding invalid properties.
    Warning {
        id: String,
        #[serde(rename = "skippedFields")]
        skipped_fields: Vec<String>,
    },
    /// Could not be created.
    Failed { error: String },
}

/// Terminal status of one row, tagged with its original 0-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    /// 0-based position in the full input sequence. Stable across retries
    /// and batch-to-single degradation.
    pub index: usize,
    #[serde(flatten)]
    pub status: RowStatus,
}

impl RowOutcome {
    /// The user-facing row number: `index + 2`.
    pub fn display_row(&self) -> u64 {
        self.index as u64 + 2
    }
}

/// A warning or failure attributed to one user-facing row number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub row: u64,
    pub message: String,
}

/// Running aggregate for one import run, read by the caller to render live
/// progress and the end-of-run report.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub state: RunState,
    /// Total input rows.
    pub total: usize,
    /// Rows that have finished processing (any status). Monotonically
    /// non-decreasing.
    pub completed: usize,
    /// Rows with a `failed` outcome so far.
    pub failed: usize,
    /// Rows with a `warning` outcome so far.
    pub warned: usize,
    /// Failure details in arrival order.
    pub errors: Vec<RowIssue>,
    /// Warning details in arrival order.
    pub warnings: Vec<RowIssue>,
}

impl RunSummary {
    /// A fresh summary in the `Uploading` state.
    pub fn new(total: usize) -> Self {
        Self {
            state: RunState::Uploading,
            total,
            completed: 0,
            failed: 0,
            warned: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Folds one completed batch into the running totals.
    ///
    /// `completed` advances by the batch size regardless of per-row status.
    pub fn record_batch(&mut self, outcomes: &[RowOutcome]) {
        for outcome in outcomes {
            match &outcome.status {
                RowStatus::Created { .. } => {}
                RowStatus::Warning { skipped_fields, .. } => {
                    self.warned += 1;
                    self.warnings.push(RowIssue {
                        row: outcome.display_row(),
                        message: format!(
                            "Sent successfully, however had to skip invalid properties: {}",
                            skipped_fields.join(", ")
                        ),
                    });
                }
                RowStatus::Failed { error } => {
                    self.failed += 1;
                    self.errors.push(RowIssue {
                        row: outcome.display_row(),
                        message: error.clone(),
                    });
                }
            }
        }
        self.completed += outcomes.len();
    }

    /// Rows that finished cleanly (no warning, no failure).
    pub fn clean(&self) -> usize {
        self.completed - self.failed - self.warned
    }

    /// The end-of-run summary line, partitioned by outcome kind.
    ///
    /// Zero-count categories are omitted, except when every category is zero,
    /// which reports as "0 succeeded".
    pub fn summary_line(&self) -> String {
        let mut parts = Vec::new();
        if self.clean() > 0 {
            parts.push(format!("{} succeeded", self.clean()));
        }
        if self.warned > 0 {
            parts.push(format!("{} succeeded with warnings", self.warned));
        }
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed));
        }
        if parts.is_empty() {
            parts.push("0 succeeded".to_string());
        }
        parts.join(", ")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
