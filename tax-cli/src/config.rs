use std::path::{Path, PathBuf};

use tax_core::{ConfigError, EngineConfig};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read configuration file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Parses and validates an engine configuration from TOML text.
///
/// Every key is optional; omitted keys keep their defaults.
///
/// ```
/// use rust_decimal::Decimal;
/// use tax_cli::config::from_toml;
///
/// let config = from_toml("marginal_delta = 500\n[social]\nalv_rate = 1.1\n").unwrap();
/// assert_eq!(config.marginal_delta, Decimal::from(500));
/// ```
pub fn from_toml(content: &str) -> Result<EngineConfig, ConfigLoadError> {
    let config: EngineConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Loads the engine configuration from `path`.
///
/// No path, or a path that does not exist, yields the defaults.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, ConfigLoadError> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    if !path.exists() {
        warn!(path = %path.display(), "configuration file not found, using defaults");
        return Ok(EngineConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = from_toml(&content)?;
    info!(path = %path.display(), "engine configuration loaded");
    Ok(config)
}
