//! CLI command handlers

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tonbag_app::AppConfig;

pub mod config;
pub mod drafts;

/// Default configuration file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tonbag").join("config.toml"))
}

/// Resolve the configuration: file, then `TONBAG_*` overrides, then checks.
///
/// An explicit `path` must exist. The default location is optional.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match default_config_path().filter(|path| path.exists()) {
            Some(path) => AppConfig::load_from_file(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => AppConfig::default(),
        },
    };
    config.merge_with_env().context("invalid TONBAG_* override")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Directory holding the draft cache.
pub fn cache_dir(config: &AppConfig) -> Result<PathBuf> {
    match &config.cache.dir {
        Some(dir) => Ok(dir.clone()),
        None => dirs::data_dir()
            .map(|dir| dir.join("tonbag"))
            .context("no data directory on this platform; set cache.dir"),
    }
}
