use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a batch before any call is dispatched.
///
/// Failures of individual calls never surface here; they are recorded in the
/// batch report and the key is skipped.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error comes from an invalid limit or ratio rather than I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = Error::Configuration("effective ceiling is 0".to_string());
        assert_eq!(err.to_string(), "Configuration error: effective ceiling is 0");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_config_file_error_is_not_configuration() {
        let err = Error::ConfigFile {
            path: PathBuf::from("missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("missing.json"));
        assert!(!err.is_configuration());
    }
}
