use crate::config_validator::ConfigValidator;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// Share of the nominal allowance used when none is configured.
pub const DEFAULT_BUFFER_RATIO: f64 = 0.8;

/// Hard limit published by the remote API: at most `max_requests` calls per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RateLimit {
    #[validate(range(min = 1, message = "max_requests must be greater than 0"))]
    pub max_requests: u32,
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "crate::config_validator::validate_window"))]
    pub window: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(120),
        }
    }
}

impl RateLimit {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    pub fn from_millis(max_requests: u32, window_ms: u64) -> Self {
        Self::new(max_requests, Duration::from_millis(window_ms))
    }

    /// Sustained rate in requests per second.
    pub fn requests_per_second(&self) -> f64 {
        self.max_requests as f64 / self.window.as_secs_f64()
    }

    /// Per-window call budget after applying `buffer_ratio` to the nominal limit.
    pub fn effective_ceiling(&self, buffer_ratio: f64) -> Result<usize> {
        ConfigValidator::effective_ceiling(self, buffer_ratio)
    }
}

/// Everything the executor needs to schedule a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExecutorConfig {
    #[validate(nested)]
    pub rate_limit: RateLimit,

    /// Fraction in (0, 1] of `max_requests` actually used per window.
    #[serde(default = "default_buffer_ratio")]
    #[validate(range(
        exclusive_min = 0.0,
        max = 1.0,
        message = "buffer_ratio must be in (0, 1]"
    ))]
    pub buffer_ratio: f64,

    /// Overall budget for the batch; no chunk is dispatched once it has elapsed.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_buffer_ratio() -> f64 {
    DEFAULT_BUFFER_RATIO
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimit::default(),
            buffer_ratio: DEFAULT_BUFFER_RATIO,
            timeout: None,
        }
    }
}

impl ExecutorConfig {
    pub fn new(rate_limit: RateLimit, buffer_ratio: f64) -> Self {
        Self {
            rate_limit,
            buffer_ratio,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parse a JSON document such as
    /// `{"rate_limit": {"max_requests": 100, "window": "2m"}, "buffer_ratio": 0.8}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn effective_ceiling(&self) -> Result<usize> {
        ConfigValidator::validate_executor_config(self)
    }
}
