//! Configuration validation.

use super::types::{PdpMode, ServerConfig};
use thiserror::Error;

/// Minimum length of the bearer token secret.
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWT secret: must be at least {MIN_JWT_SECRET_LEN} characters")]
    InvalidJwtSecret,

    #[error("Invalid bind host: {0}")]
    InvalidHost(String),

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Invalid PDP base URL: {0}")]
    InvalidPdpUrl(String),

    #[error("Invalid PDP path `{0}`: must start with `/`")]
    InvalidPdpPath(String),

    #[error("PDP timeout must be greater than zero")]
    InvalidPdpTimeout,

    #[error("Default roles must not contain blank entries")]
    InvalidDefaultRoles,

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),
}

/// Validate server configuration, reporting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
        errors.push(ConfigError::InvalidJwtSecret);
    }
    if config.auth.default_roles.iter().any(|role| role.trim().is_empty()) {
        errors.push(ConfigError::InvalidDefaultRoles);
    }

    if config.server.socket_addr().is_none() {
        errors.push(ConfigError::InvalidHost(config.server.host.clone()));
    }
    if config.server.port == 0 {
        errors.push(ConfigError::InvalidPort(0));
    }

    if config.pdp.mode == PdpMode::Http {
        match url::Url::parse(&config.pdp.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ConfigError::InvalidPdpUrl(config.pdp.base_url.clone())),
        }
        for path in [&config.pdp.check_path, &config.pdp.batch_path] {
            if !path.starts_with('/') {
                errors.push(ConfigError::InvalidPdpPath(path.clone()));
            }
        }
    }
    if config.pdp.timeout_ms == 0 || config.pdp.connect_timeout_ms == 0 {
        errors.push(ConfigError::InvalidPdpTimeout);
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigError::InvalidLogLevel(config.logging.level.clone()));
    }
    let valid_formats = ["pretty", "compact", "json"];
    if !valid_formats.contains(&config.logging.format.to_lowercase().as_str()) {
        errors.push(ConfigError::InvalidLogFormat(config.logging.format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;
    use gatehouse_authz::ListStrategy;

    #[test]
    fn test_invalid_jwt_secret() {
        let mut config = test_config();
        config.auth.jwt_secret = "short".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidJwtSecret)));
    }

    #[test]
    fn test_invalid_pdp_url() {
        let mut config = test_config();
        config.pdp.base_url = "localhost:3592".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidPdpUrl(_))));
    }

    #[test]
    fn test_local_mode_ignores_pdp_url() {
        let mut config = test_config();
        config.pdp.mode = PdpMode::Local;
        config.pdp.base_url = String::new();

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_pdp_path() {
        let mut config = test_config();
        config.pdp.batch_path = "api/check/batch".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidPdpPath(_))));
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = test_config();
        config.server.port = 0;
        config.pdp.timeout_ms = 0;
        config.logging.level = "loud".to_string();
        config.logging.format = "xml".to_string();
        config.auth.default_roles = vec![" ".to_string()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&test_config()).is_ok());
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            server: ServerBindConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                request_timeout_secs: 30,
                body_limit_bytes: 1024 * 1024,
            },
            auth: AuthConfig {
                jwt_secret: "a".repeat(32),
                default_roles: vec!["user".to_string()],
            },
            pdp: PdpConfig {
                mode: PdpMode::Http,
                base_url: "http://localhost:3592".to_string(),
                playground_instance: None,
                check_path: "/api/check".to_string(),
                batch_path: "/api/check/batch".to_string(),
                timeout_ms: 5000,
                connect_timeout_ms: 2000,
                list_strategy: ListStrategy::Batch,
            },
            logging: LoggingConfig::default(),
        }
    }
}
