//! Rig configuration loading for the control unit binary.
//!
//! A missing file at the default location falls back to the built-in
//! defaults; an explicitly given file must exist.

use std::path::Path;

use tensile_common::config::{ConfigError, ConfigLoader};
use tensile_common::tester::config::RigConfig;
use tracing::{info, warn};

/// Load and validate a rig configuration file.
pub fn load_config(path: &Path) -> Result<RigConfig, ConfigError> {
    let cfg = RigConfig::load(path)?;
    cfg.validate()?;
    info!("Loaded configuration from {}", path.display());
    Ok(cfg)
}

/// Parse and validate an in-memory document.
pub fn load_config_from_str(content: &str) -> Result<RigConfig, ConfigError> {
    let cfg = RigConfig::from_toml_str(content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Like [`load_config`], but a missing file yields the defaults when
/// `required` is false.
pub fn load_config_or_default(path: &Path, required: bool) -> Result<RigConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::FileNotFound) if !required => {
            warn!("{} not found, using built-in defaults", path.display());
            let cfg = RigConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
        other => other,
    }
}
