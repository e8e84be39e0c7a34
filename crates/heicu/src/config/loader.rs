use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

pub const CONFIG_VERSION: &str = "1.0";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// `<config dir>/heicu/config.json`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("heicu").join("config.json"))
}

/// Loads the config at the default location, or the built-in defaults when
/// no file exists there. A file that exists but is invalid is still an error.
pub fn load_default_or_fallback() -> Result<Config, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => {
            log::debug!("Loading config from {}", path.display());
            load_config(path)
        }
        _ => {
            log::debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if let Err(e) = config.conversion_settings() {
        return Err(ConfigError::Validation {
            message: e.to_string(),
        });
    }

    if config.max_concurrent_decodes == 0 {
        return Err(ConfigError::Validation {
            message: "max_concurrent_decodes must be at least 1".to_string(),
        });
    }

    if config.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "event_capacity must be at least 1".to_string(),
        });
    }

    if config.decoder.program.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "decoder.program must not be empty".to_string(),
        });
    }

    Ok(())
}
