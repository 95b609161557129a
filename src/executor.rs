//! Rate-limited batch execution.
//!
//! Keys are split into chunks of at most the effective ceiling. Every call of
//! a chunk is dispatched at once, the chunk is awaited in full, and the
//! executor then sleeps for the whole window before the next chunk. The sleep
//! starts only after the slowest call has settled, so no window ever sees more
//! than `effective_ceiling` calls.

use crate::config_validator::ConfigValidator;
use crate::error::Result;
use crate::outcome::CallOutcome;
use crate::rate_limit_config::{ExecutorConfig, RateLimit};
use crate::report::{BatchReport, CallFailure};
use futures::future::join_all;
use std::fmt;
use std::future::Future;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Executes batches of remote calls under a fixed-window rate limit
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    config: ExecutorConfig,
    ceiling: usize,
    cancel: CancellationToken,
}

impl BatchExecutor {
    /// Validate `config` and build an executor. Fails if the effective ceiling is 0.
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        let ceiling = ConfigValidator::validate_executor_config(&config)?;

        Ok(Self {
            config,
            ceiling,
            cancel: CancellationToken::new(),
        })
    }

    /// Stop dispatching new chunks once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn effective_ceiling(&self) -> usize {
        self.ceiling
    }

    /// Number of chunks a batch of `key_count` keys is split into
    pub fn chunk_count(&self, key_count: usize) -> usize {
        key_count.div_ceil(self.ceiling)
    }

    /// Run `call_fn` for every key and return the successful payloads in key order.
    ///
    /// Failed keys are logged and left out of the result.
    pub async fn execute<K, P, T, E, F, Fut>(&self, call_fn: F, keys: Vec<K>, params: P) -> Vec<T>
    where
        K: Clone + fmt::Display,
        P: Clone,
        E: fmt::Display,
        F: Fn(K, P) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.execute_with_report(call_fn, keys, params)
            .await
            .into_results()
    }

    /// Same as [`execute`](Self::execute) but keeps failures and timing in a report
    pub async fn execute_with_report<K, P, T, E, F, Fut>(
        &self,
        call_fn: F,
        keys: Vec<K>,
        params: P,
    ) -> BatchReport<T>
    where
        K: Clone + fmt::Display,
        P: Clone,
        E: fmt::Display,
        F: Fn(K, P) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let started = Instant::now();
        let batch_id = Uuid::new_v4();
        let chunks_planned = self.chunk_count(keys.len());
        let mut report = BatchReport::new(batch_id, keys.len(), chunks_planned);

        if keys.is_empty() {
            debug!(batch_id = %batch_id, "Empty batch, nothing to dispatch");
            return report;
        }

        let deadline = self.config.timeout.map(|timeout| started + timeout);

        info!(
            batch_id = %batch_id,
            keys = keys.len(),
            chunks = chunks_planned,
            ceiling = self.ceiling,
            window_ms = self.config.rate_limit.window.as_millis() as u64,
            "Starting batch"
        );

        let mut chunks = keys.chunks(self.ceiling).enumerate().peekable();
        while let Some((index, chunk)) = chunks.next() {
            if self.should_stop(deadline) {
                warn!(
                    batch_id = %batch_id,
                    chunk = index,
                    remaining_keys = report.requested - report.attempted,
                    "Batch stopped before dispatching chunk"
                );
                report.cancelled = true;
                break;
            }

            debug!(batch_id = %batch_id, chunk = index, size = chunk.len(), "Dispatching chunk");

            let outcomes: Vec<CallOutcome<T>> = join_all(chunk.iter().map(|key| {
                let call = call_fn(key.clone(), params.clone());
                async move { CallOutcome::from(call.await) }
            }))
            .await;

            report.chunks_dispatched += 1;
            report.attempted += chunk.len();

            for (key, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    CallOutcome::Success(payload) => report.results.push(payload),
                    CallOutcome::Failure(reason) => {
                        warn!(
                            batch_id = %batch_id,
                            chunk = index,
                            key = %key,
                            error = %reason,
                            "Call failed, skipping key"
                        );
                        report.failures.push(CallFailure {
                            key: key.to_string(),
                            reason,
                        });
                    }
                }
            }

            if chunks.peek().is_some() && !self.wait_window(deadline).await {
                warn!(batch_id = %batch_id, chunk = index, "Batch stopped during rate limit window");
                report.cancelled = true;
                break;
            }
        }

        report.elapsed = started.elapsed();

        info!(
            batch_id = %batch_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Batch finished"
        );

        report
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        self.cancel.is_cancelled() || deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Sleep for one full window. Returns false if cancelled or timed out first.
    async fn wait_window(&self, deadline: Option<Instant>) -> bool {
        let expired = async {
            match deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = time::sleep(self.config.rate_limit.window) => true,
            _ = expired => false,
        }
    }
}

/// One-shot form: validate the limit, run the batch and return the payloads.
///
/// Only a configuration error is returned as `Err`; failed calls are skipped.
pub async fn execute<K, P, T, E, F, Fut>(
    call_fn: F,
    keys: Vec<K>,
    params: P,
    rate_limit: RateLimit,
    buffer_ratio: f64,
) -> Result<Vec<T>>
where
    K: Clone + fmt::Display,
    P: Clone,
    E: fmt::Display,
    F: Fn(K, P) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let executor = BatchExecutor::new(ExecutorConfig::new(rate_limit, buffer_ratio))?;
    Ok(executor.execute(call_fn, keys, params).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn executor(max_requests: u32, window_ms: u64, buffer_ratio: f64) -> BatchExecutor {
        BatchExecutor::new(ExecutorConfig::new(
            RateLimit::from_millis(max_requests, window_ms),
            buffer_ratio,
        ))
        .unwrap()
    }

    #[test]
    fn test_chunk_count() {
        let executor = executor(2, 1000, 1.0);
        assert_eq!(executor.effective_ceiling(), 2);
        assert_eq!(executor.chunk_count(0), 0);
        assert_eq!(executor.chunk_count(1), 1);
        assert_eq!(executor.chunk_count(5), 3);
        assert_eq!(executor.chunk_count(6), 3);
    }

    #[test]
    fn test_rejects_zero_ceiling() {
        let result = BatchExecutor::new(ExecutorConfig::new(RateLimit::from_millis(1, 1000), 0.5));
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_returns_immediately() {
        let executor = executor(2, 1000, 1.0);
        let started = Instant::now();

        let report = executor
            .execute_with_report(
                |key: u32, _: ()| async move { Ok::<_, String>(key) },
                Vec::new(),
                (),
            )
            .await;

        assert!(report.results.is_empty());
        assert_eq!(report.chunks_dispatched, 0);
        assert!(report.is_complete());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_chunk_has_no_wait() {
        let executor = executor(10, 60_000, 0.8);
        let started = Instant::now();

        let results = executor
            .execute(
                |key: u32, offset: u32| async move { Ok::<_, String>(key + offset) },
                vec![1, 2, 3],
                100,
            )
            .await;

        assert_eq!(results, vec![101, 102, 103]);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_cancelled_token_dispatches_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let executor = executor(2, 1000, 1.0).with_cancellation(token);

        let report = executor
            .execute_with_report(
                |key: u32, _: ()| async move { Ok::<_, String>(key) },
                vec![1, 2, 3],
                (),
            )
            .await;

        assert!(report.cancelled);
        assert_eq!(report.attempted, 0);
        assert_eq!(report.skipped(), 3);
    }
}
