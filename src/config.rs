use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{ConfigError, ConfigResult as Result};
use crate::http_client::{HttpClientConfig, HttpValidationOptions};
use crate::validator::ValidationOptions;

/// Upper bound for the per-hook network timeout.
pub const MAX_TIMEOUT_MS: u64 = 60_000;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Validator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationSection,
    pub network: NetworkConfig,
    pub catalog: CatalogConfig,
}

/// Which hook families run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationSection {
    /// Run synchronous and network hooks
    pub run_custom: bool,
    /// Run network hooks (requires `run_custom`)
    pub run_network: bool,
}

/// Network hook configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-hook timeout in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
    pub pool_idle_timeout_seconds: u64,
}

/// Catalog override
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CatalogConfig {
    /// TOML or JSON catalog replacing the built-in VAST catalog
    pub path: Option<PathBuf>,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            run_custom: true,
            run_network: true,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let http = HttpClientConfig::default();
        Self {
            timeout_ms: http.timeout_ms,
            user_agent: http.user_agent,
            pool_idle_timeout_seconds: http.pool_idle_timeout_seconds,
        }
    }
}

impl NetworkConfig {
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout_ms: self.timeout_ms,
            user_agent: self.user_agent.clone(),
            pool_idle_timeout_seconds: self.pool_idle_timeout_seconds,
            ..HttpClientConfig::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration manager for loading and layering configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment
    pub async fn load_config(path: Option<&Path>) -> Result<Config> {
        Self::load_config_with(&SystemEnvProvider, path).await
    }

    pub async fn load_config_with(env: &impl EnvProvider, path: Option<&Path>) -> Result<Config> {
        let config = match path {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };

        let config = Self::apply_environment_overrides_with(env, config)?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => match toml::from_str::<Config>(&content) {
                Ok(config) => Ok(config),
                Err(_) => Ok(serde_json::from_str(&content)?),
            },
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "vast-validator.toml",
            "vast-validator.json",
            ".vast-validator.toml",
            ".vast-validator.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                debug!(path = %path.display(), "loading configuration");
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("vast-validator");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    debug!(path = %path.display(), "loading configuration");
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(value) = env.get("VAST_VALIDATOR_RUN_CUSTOM") {
            config.validation.run_custom = parse_env("VAST_VALIDATOR_RUN_CUSTOM", &value)?;
        }

        if let Some(value) = env.get("VAST_VALIDATOR_RUN_NETWORK") {
            config.validation.run_network = parse_env("VAST_VALIDATOR_RUN_NETWORK", &value)?;
        }

        if let Some(value) = env.get("VAST_VALIDATOR_TIMEOUT_MS") {
            config.network.timeout_ms = parse_env("VAST_VALIDATOR_TIMEOUT_MS", &value)?;
        }

        if let Some(user_agent) = env.get("VAST_VALIDATOR_USER_AGENT") {
            config.network.user_agent = user_agent;
        }

        if let Some(path) = env.get("VAST_VALIDATOR_CATALOG") {
            config.catalog.path = Some(PathBuf::from(path)).filter(|p| !p.as_os_str().is_empty());
        }

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.network.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Validation(format!(
                "Timeout cannot exceed {MAX_TIMEOUT_MS}ms"
            )));
        }

        if config.network.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "User agent cannot be empty".to_string(),
            ));
        }

        if config.validation.run_network && !config.validation.run_custom {
            return Err(ConfigError::Validation(
                "Network validators cannot run while custom validators are disabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Turn a loaded configuration into per-call validation options.
    ///
    /// Loads the catalog override, if any, and builds the HTTP client.
    pub async fn validation_options(config: &Config) -> crate::error::Result<ValidationOptions> {
        let mut options = ValidationOptions::default();
        if !config.validation.run_custom {
            options = options.disable_custom_validators();
        } else if !config.validation.run_network {
            options = options.disable_network_validators();
        }

        if let Some(path) = &config.catalog.path {
            let catalog = Catalog::load_from_file(path).await?;
            options = options.with_catalog(Arc::new(catalog));
        }

        let http = HttpValidationOptions::from_config(&config.network.http_client_config())?;
        Ok(options.with_http_options(http))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {key} value: {value}")))
}
