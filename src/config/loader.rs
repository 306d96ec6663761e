//! Configuration Loader
//!
//! Environment-aware loading. Sources are layered, later ones winning:
//!
//! 1. [`GeotallyConfig::default`]
//! 2. `<config_dir>/base.toml` (optional)
//! 3. `<config_dir>/<environment>.toml` (optional)
//! 4. `GEOTALLY__<SECTION>__<KEY>` environment variables, for example
//!    `GEOTALLY__MESSAGING__VISIBILITY_TIMEOUT_SECONDS=60`
//!
//! The environment comes from `GEOTALLY_ENV` and defaults to `development`.

use config::{Config, Environment, File};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::GeotallyConfig;
use crate::error::{GeotallyError, Result};

const ENV_PREFIX: &str = "GEOTALLY";
const ENV_SEPARATOR: &str = "__";

pub struct ConfigManager {
    config: GeotallyConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>> {
        Self::load_with_overrides(config_dir, environment, None)
    }

    /// Like [`Self::load_from_directory_with_env`] but reads environment
    /// overrides from `overrides` instead of the process environment. Keys
    /// use the same `GEOTALLY__SECTION__KEY` form.
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> Result<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::build_config(&config_directory, environment, overrides)?;
        config.validate()?;

        info!(
            environment = %environment,
            task_queue = %config.messaging.task_queue,
            result_queue = %config.messaging.result_queue,
            request_queue = %config.messaging.request_queue,
            database_configured = config.database.url.is_some(),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    fn build_config(
        config_directory: &Path,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> Result<GeotallyConfig> {
        let defaults = Config::try_from(&GeotallyConfig::default()).map_err(config_error)?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(config_directory.join("base.toml")).required(false))
            .add_source(
                File::from(config_directory.join(format!("{environment}.toml"))).required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(overrides),
            )
            .build()
            .map_err(config_error)?;

        config.try_deserialize().map_err(config_error)
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &GeotallyConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    fn detect_environment() -> String {
        env::var("GEOTALLY_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::var("GEOTALLY_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    /// Defaults only, used when loading fails
    fn fallback() -> ConfigManager {
        ConfigManager {
            config: GeotallyConfig::default(),
            environment: Self::detect_environment(),
            config_directory: Self::default_config_directory(),
        }
    }
}

fn config_error(e: config::ConfigError) -> GeotallyError {
    GeotallyError::Configuration(e.to_string())
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("environment", &self.environment)
            .field("config_directory", &self.config_directory)
            .field("messaging", &self.config.messaging)
            .finish()
    }
}

/// Global configuration singleton for easy access throughout the application
static GLOBAL_CONFIG: OnceLock<Arc<ConfigManager>> = OnceLock::new();

impl ConfigManager {
    /// Get or initialize the global configuration instance
    pub fn global() -> Arc<ConfigManager> {
        GLOBAL_CONFIG
            .get_or_init(|| {
                ConfigManager::load().unwrap_or_else(|e| {
                    warn!(error = %e, "Configuration loading failed, using defaults");
                    Arc::new(ConfigManager::fallback())
                })
            })
            .clone()
    }

    /// Initialize global configuration with a specific directory. The first
    /// initialization wins.
    pub fn initialize_global(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let config_manager = ConfigManager::load_from_directory(config_dir)?;
        let _ = GLOBAL_CONFIG.set(config_manager.clone());
        Ok(config_manager)
    }
}
