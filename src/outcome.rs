use std::fmt;

/// Settled result of a single remote call.
///
/// Failures keep only the rendered reason, so callers never see the call
/// function's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Success(T),
    Failure(String),
}

impl<T> CallOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            CallOutcome::Success(payload) => Some(payload),
            CallOutcome::Failure(_) => None,
        }
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for CallOutcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(payload) => CallOutcome::Success(payload),
            Err(err) => CallOutcome::Failure(err.to_string()),
        }
    }
}
