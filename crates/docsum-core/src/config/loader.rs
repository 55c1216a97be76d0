//! Configuration loader for YAML files and environment resolution

use crate::config::types::*;
use crate::errors::DocsumError;
use std::env;
use std::path::Path;
use tokio::fs;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "DOCSUM_CONFIG";

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "docsum.yaml";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<DocsumConfig, DocsumError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            DocsumError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<DocsumConfig, DocsumError> {
        let mut config: DocsumConfig = if content.trim().is_empty() {
            DocsumConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| DocsumError::ConfigError(format!("Failed to parse YAML config: {}", e)))?
        };

        Self::resolve_llm_auth(&mut config.llm.auth);
        config.validate()?;

        Ok(config)
    }

    /// Resolve the configuration the CLI should run with: the file named by
    /// `DOCSUM_CONFIG`, else `docsum.yaml` in the working directory, else
    /// built-in defaults.
    pub async fn discover() -> Result<DocsumConfig, DocsumError> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            log::info!("Loading configuration from {} ({})", path, CONFIG_PATH_ENV);
            return Self::from_file(path).await;
        }

        if fs::try_exists(DEFAULT_CONFIG_FILE).await.unwrap_or(false) {
            log::info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
            return Self::from_file(DEFAULT_CONFIG_FILE).await;
        }

        log::debug!("No configuration file found, using defaults");
        Self::from_str("")
    }

    /// Fill in `api_key` from `api_key_env` when no key is given inline.
    /// A missing variable is not an error here; the gateway reports it when
    /// it is built.
    fn resolve_llm_auth(auth: &mut LlmAuth) {
        if auth.api_key.is_some() {
            return;
        }

        if let Some(env_var) = &auth.api_key_env {
            match env::var(env_var) {
                Ok(value) if !value.is_empty() => auth.api_key = Some(value),
                _ => log::debug!("Environment variable {} is not set", env_var),
            }
        }
    }
}
