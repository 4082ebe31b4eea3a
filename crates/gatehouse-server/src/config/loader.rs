//! Configuration loading utilities.

use super::types::ServerConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Environment prefix for configuration overrides, e.g. `GATEHOUSE__PDP__BASE_URL`.
pub const ENV_PREFIX: &str = "GATEHOUSE";

/// Load configuration from various sources.
///
/// Sources in increasing precedence: embedded defaults, inline TOML,
/// config file, environment.
pub struct ConfigLoader {
    config_path: Option<String>,
    inline: Vec<String>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            inline: Vec::new(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Set config file path.
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Layer a TOML document over the defaults.
    pub fn with_toml(mut self, toml: impl Into<String>) -> Self {
        self.inline.push(toml.into());
        self
    }

    /// Set environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration.
    pub fn load(&self) -> Result<ServerConfig> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            include_str!("defaults.toml"),
            config::FileFormat::Toml,
        ));

        for toml in &self.inline {
            builder = builder.add_source(config::File::from_str(toml, config::FileFormat::Toml));
        }

        if let Some(path) = &self.config_path {
            if Path::new(path).exists() {
                info!(path = %path, "Loading config file");
                builder = builder.add_source(config::File::with_name(path));
            } else {
                info!(path = %path, "Config file not found, skipping");
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration from the environment, honouring `CONFIG_PATH`.
pub fn load_config() -> Result<ServerConfig> {
    let mut loader = ConfigLoader::new();
    if let Ok(path) = std::env::var("CONFIG_PATH") {
        loader = loader.with_config_path(path);
    }

    loader.load()
}
