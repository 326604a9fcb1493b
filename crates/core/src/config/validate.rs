use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Job parallelism and timeouts are positive
/// - Encoder timeout is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Jobs validation
    if config.jobs.max_parallel == 0 {
        return Err(ConfigError::ValidationError(
            "jobs.max_parallel must be at least 1".to_string(),
        ));
    }
    if config.jobs.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "jobs.timeout_secs cannot be 0".to_string(),
        ));
    }

    // Converter validation
    if config.converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.storage.upload_dir == config.storage.converted_dir {
        return Err(ConfigError::ValidationError(
            "storage.upload_dir and storage.converted_dir must differ".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        tokio_test::assert_ok!(validate_config(&Config::default()));
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_parallelism_fails() {
        let mut config = Config::default();
        config.jobs.max_parallel = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_parallel"));
    }

    #[test]
    fn test_validate_zero_timeouts_fail() {
        let mut config = Config::default();
        config.jobs.timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.converter.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_shared_storage_dirs_fail() {
        let mut config = Config::default();
        config.storage.converted_dir = config.storage.upload_dir.clone();
        assert!(validate_config(&config).is_err());
    }
}
