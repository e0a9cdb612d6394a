use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{RhaiConfig, ServerConfig};

/// Application configuration for scriptgate.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rhai script execution configuration.
    #[serde(default)]
    pub rhai: RhaiConfig,

    /// Directory of `.rhai` service scripts loaded at startup, relative to the
    /// configuration directory unless absolute.
    #[serde(default)]
    pub services_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading `app.yaml` from the configuration
    /// directory (if present) and `SCRIPTGATE__*` environment overrides.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)).required(false))
            .add_source(Environment::with_prefix("SCRIPTGATE").separator("__"))
            .build()?;
        let mut config: Self = s.try_deserialize()?;

        // Resolve the services directory relative to the config directory.
        if let Some(dir) = config.services_dir.take() {
            let resolved = if dir.is_absolute() { dir } else { Path::new(config_dir_str).join(dir) };
            config.services_dir = Some(resolved);
        }

        Ok(config)
    }
}
