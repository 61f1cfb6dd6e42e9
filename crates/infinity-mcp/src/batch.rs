//! Bounded-concurrency batch executor.
//!
//! Runs one fallible async operation per identifier with at most
//! `concurrency` operations in flight and collects every outcome, success or
//! failure, without letting one failure stop its siblings.
//!
//! Workers are cooperative futures polled by a single `join_all` inside the
//! calling task, not spawned tasks or threads. They share a pull queue whose
//! claim step is a single atomic increment, so no identifier is ever claimed
//! twice. Each worker processes its claims one at a time; results are
//! appended in completion order.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::error::ApiError;

/// Lower bound for the worker count.
pub const MIN_CONCURRENCY: usize = 1;
/// Upper bound for the worker count.
pub const MAX_CONCURRENCY: usize = 32;
/// Worker count used when the caller does not supply one.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Outcome of one unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkResult {
    Success { id: String, payload: Value },
    Failure { id: String, error: Value },
}

impl WorkResult {
    /// Convert an operation result, attaching the identifier.
    pub fn from_result(id: String, result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(payload) => WorkResult::Success { id, payload },
            Err(err) => WorkResult::Failure {
                id,
                error: err.detail(),
            },
        }
    }

    /// Identifier this result belongs to.
    pub fn id(&self) -> &str {
        match self {
            WorkResult::Success { id, .. } | WorkResult::Failure { id, .. } => id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkResult::Success { .. })
    }
}

/// A failed unit of work as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub id: String,
    pub error: Value,
}

/// Partitioned batch result, each side in completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub successes: Vec<Value>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    /// Total number of units of work represented.
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<WorkResult>> for BatchOutcome {
    fn from(results: Vec<WorkResult>) -> Self {
        let mut outcome = BatchOutcome::default();
        for result in results {
            match result {
                WorkResult::Success { payload, .. } => outcome.successes.push(payload),
                WorkResult::Failure { id, error } => {
                    outcome.failures.push(BatchFailure { id, error })
                }
            }
        }
        outcome
    }
}

/// Everything a batch run produced, before partitioning.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Results in completion order, exactly one per input identifier.
    pub results: Vec<WorkResult>,
    /// Number of workers that ran.
    pub workers: usize,
}

impl BatchReport {
    pub fn into_outcome(self) -> BatchOutcome {
        BatchOutcome::from(self.results)
    }
}

/// Clamp a requested worker count to `[MIN_CONCURRENCY, MAX_CONCURRENCY]`.
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

/// Read a `concurrency` argument.
///
/// Numbers and numeric strings are accepted. A missing, zero or non-numeric
/// value selects `default`. The result is clamped and truncated to an integer.
pub fn resolve_concurrency(value: Option<&Value>, default: usize) -> usize {
    let requested = value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(true) => Some(1.0),
            _ => None,
        })
        .filter(|n| !n.is_nan() && *n != 0.0);

    match requested {
        Some(n) => n.clamp(MIN_CONCURRENCY as f64, MAX_CONCURRENCY as f64) as usize,
        None => clamp_concurrency(default),
    }
}

/// Shared pull queue. Claiming is one atomic increment of the cursor.
struct WorkQueue {
    items: Vec<String>,
    cursor: AtomicUsize,
}

impl WorkQueue {
    fn new(items: Vec<String>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    fn claim(&self) -> Option<&str> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(index).map(String::as_str)
    }
}

/// Executes batches with a fixed, clamped concurrency limit.
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    concurrency: usize,
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl BatchExecutor {
    /// Create an executor; `concurrency` is clamped to `[1, 32]`.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: clamp_concurrency(concurrency),
        }
    }

    /// The clamped concurrency limit.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Workers started for `items` identifiers: never more than there is work for.
    pub fn worker_count(&self, items: usize) -> usize {
        self.concurrency.min(items)
    }

    /// Run `per_item` once for every identifier.
    ///
    /// Completes only after every identifier has produced exactly one
    /// [`WorkResult`]. Errors and panics inside `per_item` become failure
    /// results for that identifier alone.
    pub async fn run<F, Fut>(&self, identifiers: Vec<String>, per_item: F) -> BatchReport
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Value, ApiError>>,
    {
        let total = identifiers.len();
        let workers = self.worker_count(total);
        if workers == 0 {
            return BatchReport::default();
        }

        let span = tracing::info_span!("batch", items = total, workers);
        async {
            let queue = WorkQueue::new(identifiers);
            let results = Mutex::new(Vec::with_capacity(total));

            let runners = (0..workers).map(|worker| {
                let queue = &queue;
                let results = &results;
                let per_item = &per_item;
                async move {
                    let mut processed = 0usize;
                    while let Some(id) = queue.claim() {
                        let result = run_one(id, per_item).await;
                        if !result.is_success() {
                            tracing::debug!(worker, id = %result.id(), "Batch item failed");
                        }
                        results
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .push(result);
                        processed += 1;
                    }
                    tracing::trace!(worker, processed, "Batch worker finished");
                }
            });
            join_all(runners).await;

            let results = results.into_inner().unwrap_or_else(|e| e.into_inner());
            let failed = results.iter().filter(|r| !r.is_success()).count();
            tracing::info!(
                succeeded = results.len() - failed,
                failed,
                "Batch completed"
            );

            BatchReport { results, workers }
        }
        .instrument(span)
        .await
    }
}

async fn run_one<F, Fut>(id: &str, per_item: &F) -> WorkResult
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Value, ApiError>>,
{
    let outcome = AssertUnwindSafe(async { per_item(id.to_string()).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(result) => WorkResult::from_result(id.to_string(), result),
        Err(panic) => WorkResult::Failure {
            id: id.to_string(),
            error: Value::String(panic_message(panic.as_ref())),
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("item handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("item handler panicked: {s}")
    } else {
        "item handler panicked".to_string()
    }
}

/// Run a batch with a caller-supplied limit and return the partitioned outcome.
pub async fn run_batch<F, Fut>(identifiers: Vec<String>, concurrency: usize, per_item: F) -> BatchOutcome
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Value, ApiError>>,
{
    BatchExecutor::new(concurrency)
        .run(identifiers, per_item)
        .await
        .into_outcome()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn numbered(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("item-{i}")).collect()
    }

    /// Tracks in-flight and peak concurrency of a per-item closure.
    #[derive(Default, Clone)]
    struct Gauge {
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    impl Gauge {
        async fn track(&self, delay: Duration) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn assert_partition(report: &BatchReport, input: &[String]) {
        assert_eq!(report.results.len(), input.len());
        let seen: Vec<&str> = report.results.iter().map(WorkResult::id).collect();
        let unique: HashSet<&str> = seen.iter().copied().collect();
        assert_eq!(unique.len(), input.len(), "duplicate results: {seen:?}");
        for id in input {
            assert!(unique.contains(id.as_str()), "missing result for {id}");
        }
    }

    #[test]
    fn test_clamp_concurrency() {
        assert_eq!(clamp_concurrency(0), 1);
        assert_eq!(clamp_concurrency(1), 1);
        assert_eq!(clamp_concurrency(8), 8);
        assert_eq!(clamp_concurrency(32), 32);
        assert_eq!(clamp_concurrency(1000), 32);
    }

    #[test]
    fn test_resolve_concurrency() {
        assert_eq!(resolve_concurrency(None, 8), 8);
        assert_eq!(resolve_concurrency(Some(&json!(4)), 8), 4);
        assert_eq!(resolve_concurrency(Some(&json!("12")), 8), 12);
        assert_eq!(resolve_concurrency(Some(&json!(0)), 8), 8);
        assert_eq!(resolve_concurrency(Some(&json!("lots")), 8), 8);
        assert_eq!(resolve_concurrency(Some(&json!(null)), 8), 8);
        assert_eq!(resolve_concurrency(Some(&json!(-5)), 8), 1);
        assert_eq!(resolve_concurrency(Some(&json!(100)), 8), 32);
        assert_eq!(resolve_concurrency(Some(&json!(2.7)), 8), 2);
        assert_eq!(resolve_concurrency(None, 64), 32);
    }

    #[test]
    fn test_worker_count() {
        let executor = BatchExecutor::new(8);
        assert_eq!(executor.worker_count(0), 0);
        assert_eq!(executor.worker_count(3), 3);
        assert_eq!(executor.worker_count(50), 8);

        assert_eq!(BatchExecutor::new(0).worker_count(10), 1);
        assert_eq!(BatchExecutor::new(99).worker_count(100), 32);
    }

    #[tokio::test]
    async fn test_empty_batch_spawns_no_workers() {
        let gauge = Gauge::default();
        let report = BatchExecutor::new(8)
            .run(Vec::new(), |_id| {
                let gauge = gauge.clone();
                async move {
                    gauge.track(Duration::ZERO).await;
                    Ok(json!(null))
                }
            })
            .await;

        assert_eq!(report.workers, 0);
        assert!(report.results.is_empty());
        assert_eq!(gauge.calls(), 0);
        assert_eq!(report.into_outcome(), BatchOutcome::default());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_siblings() {
        let outcome = run_batch(ids(&["a", "b", "c"]), 8, |id| async move {
            if id == "b" {
                Err(ApiError::Transport("simulated network failure".into()))
            } else {
                Ok(json!({ "id": id }))
            }
        })
        .await;

        let mut succeeded: Vec<String> = outcome
            .successes
            .iter()
            .map(|v| v["id"].as_str().unwrap().to_string())
            .collect();
        succeeded.sort();
        assert_eq!(succeeded, vec!["a", "c"]);

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, "b");
        assert_eq!(
            outcome.failures[0].error,
            json!("request failed: simulated network failure")
        );
    }

    #[tokio::test]
    async fn test_remote_error_body_is_kept_verbatim() {
        let outcome = run_batch(ids(&["missing"]), 1, |_id| async move {
            Err(ApiError::Status {
                status: 404,
                body: json!({"errors": [{"message": "Not found"}]}),
            })
        })
        .await;

        assert!(outcome.successes.is_empty());
        assert_eq!(
            outcome.failures[0].error,
            json!({"errors": [{"message": "Not found"}]})
        );
    }

    #[tokio::test]
    async fn test_partition_for_various_limits() {
        for (count, limit) in [(1, 1), (5, 2), (10, 32), (40, 8), (33, 100), (7, 0)] {
            let input = numbered(count);
            let report = BatchExecutor::new(limit)
                .run(input.clone(), |id| async move {
                    tokio::task::yield_now().await;
                    let n: usize = id.trim_start_matches("item-").parse().unwrap();
                    if n % 3 == 0 {
                        Err(ApiError::Transport(format!("boom {id}")))
                    } else {
                        Ok(json!(id))
                    }
                })
                .await;

            assert_eq!(report.workers, clamp_concurrency(limit).min(count));
            assert_partition(&report, &input);

            let outcome = report.into_outcome();
            assert_eq!(outcome.len(), count);
            assert_eq!(outcome.failures.len(), (0..count).filter(|n| n % 3 == 0).count());
        }
    }

    #[tokio::test]
    async fn test_in_flight_work_never_exceeds_limit() {
        let gauge = Gauge::default();
        let input = numbered(20);

        let report = BatchExecutor::new(4)
            .run(input.clone(), |id| {
                let gauge = gauge.clone();
                async move {
                    gauge.track(Duration::from_millis(10)).await;
                    Ok(json!(id))
                }
            })
            .await;

        assert_eq!(report.workers, 4);
        assert_eq!(gauge.calls(), 20);
        assert_eq!(gauge.peak(), 4, "peak concurrency was {}", gauge.peak());
        assert_partition(&report, &input);
    }

    #[tokio::test]
    async fn test_workers_never_exceed_item_count() {
        let gauge = Gauge::default();
        let report = BatchExecutor::new(32)
            .run(numbered(3), |id| {
                let gauge = gauge.clone();
                async move {
                    gauge.track(Duration::from_millis(10)).await;
                    Ok(json!(id))
                }
            })
            .await;

        assert_eq!(report.workers, 3);
        assert!(gauge.peak() <= 3);
    }

    #[tokio::test]
    async fn test_single_worker_is_sequential() {
        let gauge = Gauge::default();
        let input = numbered(5);
        let report = BatchExecutor::new(1)
            .run(input.clone(), |id| {
                let gauge = gauge.clone();
                async move {
                    gauge.track(Duration::from_millis(2)).await;
                    Ok(json!(id))
                }
            })
            .await;

        assert_eq!(gauge.peak(), 1);
        let order: Vec<&str> = report.results.iter().map(WorkResult::id).collect();
        assert_eq!(order, input.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_results_follow_completion_order() {
        let input = ids(&["slow", "fast"]);
        let report = BatchExecutor::new(2)
            .run(input, |id| async move {
                let delay = if id == "slow" { 50 } else { 1 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(json!(id))
            })
            .await;

        let order: Vec<&str> = report.results.iter().map(WorkResult::id).collect();
        assert_eq!(order, vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_panicking_item_becomes_failure() {
        let outcome = run_batch(ids(&["ok", "explode"]), 2, |id| async move {
            if id == "explode" {
                panic!("corrupt payload");
            }
            Ok(json!(id))
        })
        .await;

        assert_eq!(outcome.successes, vec![json!("ok")]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, "explode");
        assert!(
            outcome.failures[0]
                .error
                .as_str()
                .unwrap()
                .contains("corrupt payload")
        );
    }

    #[tokio::test]
    async fn test_duplicate_identifiers_each_produce_a_result() {
        let report = BatchExecutor::new(4)
            .run(ids(&["x", "x", "y"]), |id| async move { Ok(json!(id)) })
            .await;
        assert_eq!(report.results.len(), 3);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = BatchOutcome::from(vec![
            WorkResult::Success {
                id: "1".into(),
                payload: json!({"id": "1"}),
            },
            WorkResult::Failure {
                id: "2".into(),
                error: json!("nope"),
            },
        ]);

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "successes": [{"id": "1"}],
                "failures": [{"id": "2", "error": "nope"}]
            })
        );
    }
}
