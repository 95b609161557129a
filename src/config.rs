use crate::client::RequestParams;
use crate::error::{Error, Result};
use crate::rate_limit_config::ExecutorConfig;
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Command line and environment configuration
#[derive(Debug, Clone, Parser)]
#[command(
    name = "batch-throttler",
    version,
    about = "Fetch many resources from a rate-limited API without tripping its limit"
)]
pub struct Config {
    /// Keys to fetch, one request each
    pub keys: Vec<String>,

    /// File with one key per line; blank lines and lines starting with '#' are ignored
    #[arg(long, value_name = "PATH")]
    pub keys_file: Option<PathBuf>,

    /// JSON file with the executor configuration
    #[arg(long, value_name = "PATH", env = "BATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum requests the API allows per window
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS")]
    pub max_requests: Option<u32>,

    /// Rate limit window in milliseconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_MS")]
    pub window_ms: Option<u64>,

    /// Fraction of the allowance actually used, in (0, 1]
    #[arg(long, env = "BUFFER_RATIO")]
    pub buffer_ratio: Option<f64>,

    /// Stop dispatching new chunks after this many milliseconds
    #[arg(long, env = "BATCH_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Base URL; each key is fetched from `{base_url}/{key}`
    #[arg(long, env = "API_BASE_URL")]
    pub base_url: String,

    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "API_KEY_HEADER", default_value = "X-Api-Key")]
    pub api_key_header: String,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Build the executor configuration: file values first, then flags on top.
    pub fn executor_config(&self) -> Result<ExecutorConfig> {
        let mut config = match &self.config {
            Some(path) => ExecutorConfig::from_json_file(path)?,
            None => ExecutorConfig::default(),
        };

        if let Some(max_requests) = self.max_requests {
            config.rate_limit.max_requests = max_requests;
        }
        if let Some(window_ms) = self.window_ms {
            config.rate_limit.window = Duration::from_millis(window_ms);
        }
        if let Some(buffer_ratio) = self.buffer_ratio {
            config.buffer_ratio = buffer_ratio;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout = Some(Duration::from_millis(timeout_ms));
        }

        config.effective_ceiling()?;
        Ok(config)
    }

    /// Positional keys followed by keys from `--keys-file`, first occurrence wins.
    pub fn load_keys(&self) -> Result<Vec<String>> {
        let mut keys = self.keys.clone();

        if let Some(path) = &self.keys_file {
            let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigFile {
                path: path.clone(),
                source,
            })?;
            keys.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }

        let mut seen = HashSet::new();
        let total = keys.len();
        keys.retain(|key| seen.insert(key.clone()));
        if keys.len() < total {
            tracing::debug!(duplicates = total - keys.len(), "Dropped duplicate keys");
        }

        Ok(keys)
    }

    pub fn request_params(&self) -> RequestParams {
        let params = RequestParams::new(self.base_url.clone());
        match &self.api_key {
            Some(api_key) => params.with_api_key(self.api_key_header.clone(), api_key.clone()),
            None => params,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["batch-throttler", "--base-url", "http://localhost:8080/matches"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--max-requests",
            "20",
            "--window-ms",
            "1000",
            "--buffer-ratio",
            "0.5",
            "a",
            "b",
        ]);
        let executor_config = config.executor_config().unwrap();

        assert_eq!(executor_config.rate_limit.max_requests, 20);
        assert_eq!(executor_config.rate_limit.window, Duration::from_secs(1));
        assert_eq!(executor_config.buffer_ratio, 0.5);
        assert_eq!(executor_config.effective_ceiling().unwrap(), 10);
        assert_eq!(config.keys, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let config = parse(&["--max-requests", "1", "--buffer-ratio", "0.5"]);
        assert!(config.executor_config().is_err());
    }

    #[test]
    fn test_load_keys_merges_file_and_dedups() {
        let path = std::env::temp_dir().join(format!("batch-throttler-keys-{}.txt", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# match ids\nb\n\n  c  \na").unwrap();

        let config = parse(&["--keys-file", path.to_str().unwrap(), "a", "b"]);
        let keys = config.load_keys().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_request_params_with_api_key() {
        let config = parse(&["--api-key", "secret", "--api-key-header", "X-Riot-Token"]);
        let params = config.request_params();

        assert_eq!(params.api_key.as_deref(), Some("secret"));
        assert_eq!(params.api_key_header, "X-Riot-Token");
        assert_eq!(params.url_for("1"), "http://localhost:8080/matches/1");
    }
}
