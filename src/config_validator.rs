use crate::error::{Error, Result};
use crate::rate_limit_config::{ExecutorConfig, RateLimit};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Validates executor configuration before any call is dispatched
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the whole config and returns the effective ceiling
    pub fn validate_executor_config(config: &ExecutorConfig) -> Result<usize> {
        config.validate()?;
        Self::effective_ceiling(&config.rate_limit, config.buffer_ratio)
    }

    /// Validates a rate limit descriptor on its own
    pub fn validate_rate_limit(rate_limit: &RateLimit) -> Result<()> {
        rate_limit.validate()?;
        Ok(())
    }

    /// Computes `floor(max_requests * buffer_ratio)`, rejecting a ceiling below 1
    pub fn effective_ceiling(rate_limit: &RateLimit, buffer_ratio: f64) -> Result<usize> {
        if !buffer_ratio.is_finite() || buffer_ratio <= 0.0 || buffer_ratio > 1.0 {
            return Err(Error::Configuration(format!(
                "Buffer ratio must be in (0, 1], got {}",
                buffer_ratio
            )));
        }

        Self::validate_rate_limit(rate_limit)?;

        let ceiling = (rate_limit.max_requests as f64 * buffer_ratio).floor() as usize;
        if ceiling == 0 {
            return Err(Error::Configuration(format!(
                "Effective ceiling is 0 for max_requests={} and buffer_ratio={}",
                rate_limit.max_requests, buffer_ratio
            )));
        }

        Ok(ceiling)
    }
}

/// Rejects a zero-length window
pub fn validate_window(window: &Duration) -> std::result::Result<(), ValidationError> {
    if window.is_zero() {
        let mut err = ValidationError::new("window");
        err.message = Some("window must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ExecutorConfig::new(RateLimit::from_millis(20, 1000), 0.8);
        assert_eq!(ConfigValidator::validate_executor_config(&config).unwrap(), 16);
    }

    #[test]
    fn test_zero_max_requests() {
        let config = ExecutorConfig::new(RateLimit::from_millis(0, 1000), 1.0);
        let err = ConfigValidator::validate_executor_config(&config).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_zero_window() {
        let config = ExecutorConfig::new(RateLimit::from_millis(10, 0), 1.0);
        let err = ConfigValidator::validate_executor_config(&config).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_invalid_buffer_ratio() {
        let limit = RateLimit::from_millis(10, 1000);
        for ratio in [0.0, -0.5, 1.5, f64::NAN, f64::INFINITY] {
            let config = ExecutorConfig::new(limit, ratio);
            assert!(
                ConfigValidator::validate_executor_config(&config).is_err(),
                "ratio {} should be rejected",
                ratio
            );
        }
    }

    #[test]
    fn test_ceiling_floor_to_zero() {
        let err = ConfigValidator::effective_ceiling(&RateLimit::from_millis(4, 1000), 0.2)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_validate_window() {
        assert!(validate_window(&Duration::from_millis(1)).is_ok());
        assert!(validate_window(&Duration::ZERO).is_err());
    }
}
