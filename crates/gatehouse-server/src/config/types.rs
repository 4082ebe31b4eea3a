//! Server configuration types.

use gatehouse_authz::pdp::{DEFAULT_BATCH_PATH, DEFAULT_CHECK_PATH};
use gatehouse_authz::{ListStrategy, DEFAULT_ROLE};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Main server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server binding configuration.
    pub server: ServerBindConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Policy decision point configuration.
    pub pdp: PdpConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Address to bind, `None` when the host is not an IP address.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.server.socket_addr()
    }
}

/// Server binding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerBindConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whole-request timeout applied by the middleware stack.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Maximum accepted request body.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_body_limit() -> usize {
    1024 * 1024
}

impl ServerBindConfig {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.host
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens. No default.
    pub jwt_secret: String,
    /// Roles assumed when a token carries no role claim.
    #[serde(default = "default_roles")]
    pub default_roles: Vec<String>,
}

fn default_roles() -> Vec<String> {
    vec![DEFAULT_ROLE.to_string()]
}

/// Which decision client the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdpMode {
    /// Remote PDP over HTTP.
    #[default]
    Http,
    /// Built-in role policy evaluated in process.
    Local,
}

/// Policy decision point configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdpConfig {
    #[serde(default)]
    pub mode: PdpMode,
    /// Base URL of the remote PDP. Required in `http` mode.
    #[serde(default)]
    pub base_url: String,
    /// Policy playground instance to target instead of deployed policies.
    #[serde(default)]
    pub playground_instance: Option<String>,
    #[serde(default = "default_check_path")]
    pub check_path: String,
    #[serde(default = "default_batch_path")]
    pub batch_path: String,
    /// Bound on one decision exchange.
    #[serde(default = "default_pdp_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_pdp_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub list_strategy: ListStrategy,
}

fn default_check_path() -> String {
    DEFAULT_CHECK_PATH.to_string()
}

fn default_batch_path() -> String {
    DEFAULT_BATCH_PATH.to_string()
}

fn default_pdp_timeout() -> u64 {
    5000
}

fn default_pdp_connect_timeout() -> u64 {
    2000
}

impl PdpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty`, `compact` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let bind = ServerBindConfig {
            host: "127.0.0.1".into(),
            port: 9000,
            request_timeout_secs: 30,
            body_limit_bytes: 1024,
        };
        assert_eq!(bind.socket_addr(), Some("127.0.0.1:9000".parse().unwrap()));

        let bind = ServerBindConfig {
            host: "localhost".into(),
            ..bind
        };
        assert_eq!(bind.socket_addr(), None);
    }

    #[test]
    fn test_pdp_config_defaults() {
        let pdp: PdpConfig = serde_json::from_value(serde_json::json!({
            "base_url": "http://localhost:3592"
        }))
        .unwrap();
        assert_eq!(pdp.mode, PdpMode::Http);
        assert_eq!(pdp.check_path, "/api/check");
        assert_eq!(pdp.batch_path, "/api/check/batch");
        assert_eq!(pdp.timeout(), Duration::from_secs(5));
        assert_eq!(pdp.list_strategy, ListStrategy::Batch);
    }

    #[test]
    fn test_pdp_mode_and_strategy_names() {
        let pdp: PdpConfig = serde_json::from_value(serde_json::json!({
            "mode": "local",
            "list_strategy": "fan_out"
        }))
        .unwrap();
        assert_eq!(pdp.mode, PdpMode::Local);
        assert_eq!(pdp.list_strategy, ListStrategy::FanOut);
    }

    #[test]
    fn test_auth_default_roles() {
        let auth: AuthConfig =
            serde_json::from_value(serde_json::json!({ "jwt_secret": "x" })).unwrap();
        assert_eq!(auth.default_roles, vec!["user".to_string()]);
    }
}
