//! Batch executor.

use futures::future::join_all;
use std::time::{Duration, Instant};

/// Outcome of one fan-out, keyed by the item's position in the input.
#[derive(Debug, Clone)]
pub struct BatchResult<T, E> {
    pub successes: Vec<(usize, T)>,
    pub failures: Vec<(usize, E)>,
    pub execution_time: Duration,
}

impl<T, E> BatchResult<T, E> {
    pub fn new() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
            execution_time: Duration::ZERO,
        }
    }
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}
impl<T, E> Default for BatchResult<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct BatchError {
    pub message: String,
}
impl BatchError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}
impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
impl std::error::Error for BatchError {}

/// Runs one future per item and collects every outcome.
///
/// All items start together with no concurrency cap; a failing item never
/// cancels or fails its siblings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchExecutor;

impl BatchExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute_parallel<T, R, E, F, Fut>(
        &self,
        items: Vec<T>,
        executor_fn: F,
    ) -> BatchResult<R, BatchError>
    where
        F: Fn(T) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<R, E>>,
        E: std::fmt::Display,
    {
        let start = Instant::now();
        let outcomes = join_all(items.into_iter().map(executor_fn)).await;

        let mut result = BatchResult::new();
        for (i, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(r) => result.successes.push((i, r)),
                Err(e) => result.failures.push((i, BatchError::new(e.to_string()))),
            }
        }
        result.execution_time = start.elapsed();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failures_do_not_cancel_siblings() {
        let executor = BatchExecutor::new();
        let completed = Arc::new(AtomicUsize::new(0));

        let result = executor
            .execute_parallel(vec![1, 2, 3, 4], |n| {
                let completed = Arc::clone(&completed);
                async move {
                    tokio::task::yield_now().await;
                    completed.fetch_add(1, Ordering::SeqCst);
                    if n % 2 == 0 {
                        Err(format!("item {} failed", n))
                    } else {
                        Ok(n * 10)
                    }
                }
            })
            .await;

        assert_eq!(completed.load(Ordering::SeqCst), 4);
        assert_eq!(result.successes, vec![(0, 10), (2, 30)]);
        assert_eq!(result.failure_count(), 2);
        assert_eq!(result.failures[0].0, 1);
        assert_eq!(result.failures[0].1.to_string(), "item 2 failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_run_concurrently() {
        let executor = BatchExecutor::new();
        let start = tokio::time::Instant::now();

        let result = executor
            .execute_parallel(vec![100u64; 8], |ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, String>(ms)
            })
            .await;

        assert_eq!(result.success_count(), 8);
        // eight 100ms sleeps overlap instead of adding up
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let result = BatchExecutor::new()
            .execute_parallel(Vec::<u8>::new(), |n| async move { Ok::<_, String>(n) })
            .await;
        assert_eq!(result.success_count(), 0);
        assert_eq!(result.failure_count(), 0);
    }
}
