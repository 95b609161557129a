pub mod client;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod rate_limit_config;
pub mod report;
pub mod shutdown;

pub use config::Config;
pub use error::{Error, Result};
pub use executor::{execute, BatchExecutor};
pub use rate_limit_config::{ExecutorConfig, RateLimit};
pub use report::BatchReport;
pub use tokio_util::sync::CancellationToken;
