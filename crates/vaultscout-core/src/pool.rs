//! Bounded-concurrency executor with order-preserving results.
//!
//! Runs one async unit of work per item, at most `concurrency` at a time,
//! and returns results in item order regardless of completion order. A
//! failing item is recorded at its slot and never disturbs its neighbours.
//! Retry policy belongs to the caller; the pool holds no state after
//! [`process`] returns.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::PoolError;

/// Default number of simultaneously running work items.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// One item's failure, recorded in place of its result.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct TaskError {
    /// Human-readable failure description.
    pub reason: String,
}

impl TaskError {
    /// Wrap a failure reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Run `f` over every item with at most `concurrency` in flight.
///
/// `results[i]` always corresponds to `items[i]`. The effective concurrency
/// is `min(concurrency, items.len())`; an empty input returns immediately.
///
/// # Errors
///
/// Returns [`PoolError::InvalidConcurrency`] before any work starts if
/// `concurrency` is zero. Individual item failures are NOT errors — they
/// come back as `Err(TaskError)` in their result slot.
pub async fn process<T, U, F, Fut>(
    items: Vec<T>,
    f: F,
    concurrency: usize,
) -> Result<Vec<Result<U, TaskError>>, PoolError>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T, usize) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<U, TaskError>> + Send + 'static,
{
    if concurrency == 0 {
        return Err(PoolError::InvalidConcurrency { given: 0 });
    }
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let workers = concurrency.min(items.len());
    let semaphore = Arc::new(Semaphore::new(workers));

    let handles: Vec<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let semaphore = Arc::clone(&semaphore);
            let f = f.clone();
            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| TaskError::new("worker pool shut down"))?;
                f(item, index).await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(match handle.await {
            Ok(outcome) => outcome,
            // A panicked task must not take the rest of the batch with it.
            Err(join_err) => Err(TaskError::new(format!("worker task failed: {join_err}"))),
        });
    }
    Ok(results)
}
