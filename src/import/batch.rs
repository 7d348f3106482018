//! Batch submission with per-item fallback.
//!
//! One batch call covers up to 100 property sets. A batch-level failure is
//! never surfaced as a single error for the whole batch: every item is
//! retried individually through the property-removal path, so one invalid
//! record does not fail its 99 siblings. The fallback loop pauses for one
//! second after every 9th item as a client-side rate-limit courtesy.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::AppError;
use crate::hubspot::client::MAX_BATCH_INPUTS;
use crate::import::retry::create_with_retry;
use crate::import::{PropertySet, RecordCreator, RowOutcome, RowStatus};

/// Pause inserted into the fallback loop.
pub const FALLBACK_PAUSE: Duration = Duration::from_secs(1);

/// Fallback items processed between pauses.
pub const FALLBACK_PAUSE_EVERY: usize = 9;

/// Submits one batch, degrading to per-item creates on any batch-level error.
///
/// Returns one outcome per item in item order, indexed locally (0-based
/// within the batch); the scheduler re-bases indices onto the full input
/// sequence.
///
/// # Errors
///
/// Returns `AppError::BatchTooLarge` for more than 100 items, before any
/// network call. Everything else is absorbed into per-item outcomes.
pub async fn submit_batch(
    creator: &dyn RecordCreator,
    items: &[PropertySet],
) -> Result<Vec<RowOutcome>, AppError> {
    if items.len() > MAX_BATCH_INPUTS {
        return Err(AppError::BatchTooLarge {
            got: items.len(),
            max: MAX_BATCH_INPUTS,
        });
    }
    if items.is_empty() {
        return Ok(Vec::new());
    }

    match creator.batch_create(items).await {
        Ok(records) => Ok((0..items.len())
            .map(|i| RowOutcome {
                index: i,
                status: match records.get(i) {
                    Some(record) => RowStatus::Created {
                        id: record.id.clone(),
                    },
                    // A response shorter than the batch is a server-side
                    // contract break; the unmatched rows still get outcomes.
                    None => RowStatus::Failed {
                        error: "Missing from batch response".to_string(),
                    },
                },
            })
            .collect()),
        Err(batch_err) => {
            info!(
                "batch create failed ({}), falling back to {} single creates",
                batch_err,
                items.len()
            );
            let mut outcomes = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                if i > 0 && i % FALLBACK_PAUSE_EVERY == 0 {
                    debug!("fallback pause after item {}", i);
                    tokio::time::sleep(FALLBACK_PAUSE).await;
                }
                let status = create_with_retry(creator, item).await;
                outcomes.push(RowOutcome { index: i, status });
            }
            Ok(outcomes)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::import::CreatedRecord;

    /// Fake creator where the batch call always fails and single creates
    /// succeed unless the property set contains a `bad` key.
    struct FallbackCreator {
        single_calls: AtomicUsize,
        single_sets: Mutex<Vec<PropertySet>>,
        next_id: AtomicUsize,
    }

    impl FallbackCreator {
        fn new() -> Self {
            Self {
                single_calls: AtomicUsize::new(0),
                single_sets: Mutex::new(Vec::new()),
                next_id: AtomicUsize::new(1),
            }
        }
    }

    impl RecordCreator for FallbackCreator {
        fn create_one<'a>(
            &'a self,
            properties: &'a PropertySet,
        ) -> Pin<Box<dyn Future<Output = Result<CreatedRecord, AppError>> + Send + 'a>> {
            Box::pin(async move {
                self.single_calls.fetch_add(1, Ordering::SeqCst);
                self.single_sets.lock().unwrap().push(properties.clone());
                if properties.contains_key("bad") {
                    Err(AppError::HubSpot {
                        message: "Property values were not valid".to_string(),
                        body: Some(
                            serde_json::json!({
                                "validationResults": [{ "name": "bad" }]
                            })
                            .to_string(),
                        ),
                    })
                } else {
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    Ok(CreatedRecord { id: id.to_string() })
                }
            })
        }

        fn batch_create<'a>(
            &'a self,
            _items: &'a [PropertySet],
        ) -> Pin<Box<dyn Future<Output = Result<Vec<CreatedRecord>, AppError>> + Send + 'a>>
        {
            Box::pin(async {
                Err(AppError::HubSpot {
                    message: "Property values were not valid".to_string(),
                    body: None,
                })
            })
        }
    }

    /// Fake creator whose batch call succeeds with sequential ids.
    struct BatchOkCreator {
        short_by: usize,
    }

    impl RecordCreator for BatchOkCreator {
        fn create_one<'a>(
            &'a self,
            _properties: &'a PropertySet,
        ) -> Pin<Box<dyn Future<Output = Result<CreatedRecord, AppError>> + Send + 'a>> {
            Box::pin(async { Err(AppError::Internal("single create not expected".into())) })
        }

        fn batch_create<'a>(
            &'a self,
            items: &'a [PropertySet],
        ) -> Pin<Box<dyn Future<Output = Result<Vec<CreatedRecord>, AppError>> + Send + 'a>>
        {
            let count = items.len().saturating_sub(self.short_by);
            Box::pin(async move {
                Ok((0..count)
                    .map(|i| CreatedRecord {
                        id: format!("id-{}", i),
                    })
                    .collect())
            })
        }
    }

    fn single_prop(key: &str, value: &str) -> PropertySet {
        let mut set = PropertySet::new();
        set.insert(key.to_string(), value.to_string());
        set
    }

    fn items(n: usize) -> Vec<PropertySet> {
        (0..n).map(|i| single_prop("name", &format!("Co {}", i))).collect()
    }

    #[tokio::test]
    async fn batch_success_maps_every_item_in_order() {
        let creator = BatchOkCreator { short_by: 0 };
        let outcomes = submit_batch(&creator, &items(3)).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert_eq!(
                outcome.status,
                RowStatus::Created {
                    id: format!("id-{}", i)
                }
            );
        }
    }

    #[tokio::test]
    async fn short_batch_response_fails_unmatched_rows() {
        let creator = BatchOkCreator { short_by: 1 };
        let outcomes = submit_batch(&creator, &items(3)).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[1].status, RowStatus::Created { .. }));
        assert_eq!(
            outcomes[2].status,
            RowStatus::Failed {
                error: "Missing from batch response".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn batch_failure_retries_every_item_individually() {
        let creator = FallbackCreator::new();
        let batch = items(12);

        let outcomes = submit_batch(&creator, &batch).await.unwrap();

        // Exactly one single-create attempt per item, in item order.
        assert_eq!(outcomes.len(), 12);
        assert_eq!(creator.single_calls.load(Ordering::SeqCst), 12);
        assert_eq!(*creator.single_sets.lock().unwrap(), batch);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert!(matches!(outcome.status, RowStatus::Created { .. }));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_salvages_bad_item_without_touching_siblings() {
        let creator = FallbackCreator::new();
        let mut batch = items(5);
        batch[2].insert("bad".to_string(), "x".to_string());

        let outcomes = submit_batch(&creator, &batch).await.unwrap();

        assert_eq!(outcomes.len(), 5);
        match &outcomes[2].status {
            RowStatus::Warning { skipped_fields, .. } => {
                assert_eq!(skipped_fields, &vec!["bad".to_string()]);
            }
            other => panic!("Expected Warning for item 2, got {:?}", other),
        }
        for i in [0, 1, 3, 4] {
            assert!(
                matches!(outcomes[i].status, RowStatus::Created { .. }),
                "sibling {} should be untouched",
                i
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_pauses_after_every_ninth_item() {
        let creator = FallbackCreator::new();
        let start = tokio::time::Instant::now();

        submit_batch(&creator, &items(19)).await.unwrap();

        // Pauses land before items 9 and 18: two seconds of virtual time.
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn small_fallback_batches_never_pause() {
        let creator = FallbackCreator::new();
        let start = std::time::Instant::now();

        submit_batch(&creator, &items(9)).await.unwrap();

        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_without_any_call() {
        let creator = FallbackCreator::new();

        let result = submit_batch(&creator, &items(101)).await;

        match result.unwrap_err() {
            AppError::BatchTooLarge { got, max } => {
                assert_eq!(got, 101);
                assert_eq!(max, 100);
            }
            e => panic!("Expected BatchTooLarge, got: {:?}", e),
        }
        assert_eq!(creator.single_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_batch_yields_no_outcomes() {
        let creator = FallbackCreator::new();
        let outcomes = submit_batch(&creator, &[]).await.unwrap();
        assert!(outcomes.is_empty());
    }
}
