use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("MILO_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Write a config file populated with every declared default.
///
/// Used on first start when no configuration exists yet, so operators get
/// a complete template instead of an empty file.
pub fn write_blank_config(path: &Path) -> Result<(), ConfigError> {
    let blank = Config::default();
    let rendered =
        toml::to_string_pretty(&blank).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    std::fs::write(path, rendered).map_err(|e| ConfigError::WriteError(e.to_string()))
}
