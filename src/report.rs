use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// A key whose call failed, with the reason reported by the call function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallFailure {
    pub key: String,
    pub reason: String,
}

/// Summary of one batch invocation.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T> {
    pub batch_id: Uuid,
    /// Number of keys handed to the executor
    pub requested: usize,
    /// Number of keys whose call was dispatched
    pub attempted: usize,
    pub chunks_planned: usize,
    pub chunks_dispatched: usize,
    /// Successful payloads in chunk-major, key-minor order
    pub results: Vec<T>,
    pub failures: Vec<CallFailure>,
    /// Set when cancellation or the batch timeout stopped dispatch early
    pub cancelled: bool,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

impl<T> BatchReport<T> {
    pub fn new(batch_id: Uuid, requested: usize, chunks_planned: usize) -> Self {
        Self {
            batch_id,
            requested,
            attempted: 0,
            chunks_planned,
            chunks_dispatched: 0,
            results: Vec::with_capacity(requested),
            failures: Vec::new(),
            cancelled: false,
            elapsed: Duration::ZERO,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Keys never dispatched because the batch was stopped.
    pub fn skipped(&self) -> usize {
        self.requested - self.attempted
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.attempted == self.requested
    }

    pub fn into_results(self) -> Vec<T> {
        self.results
    }
}
