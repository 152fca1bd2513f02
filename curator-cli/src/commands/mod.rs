pub mod config;
pub mod import;
pub mod webhook;

use std::path::PathBuf;

use anyhow::{Context, Result};

use curator_core::Config;

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn load_config() -> Result<Config> {
    let home = home_dir()?;
    let config = curator_core::config::load_at(&home).context("failed to load config")?;
    tracing::debug!(
        "loaded config from {}",
        curator_core::config::config_path_at(&home).display()
    );
    Ok(config)
}
