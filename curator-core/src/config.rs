//! Curator config file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.curator/
//!   config.yaml   (mode 0600, created by `curator config init`)
//! ```
//!
//! The management token is never written to the file; `token_env` names the
//! environment variable it is read from.
//!
//! # API pattern
//!
//! Every file-touching function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://api.contentful.com";
pub const DEFAULT_ENVIRONMENT: &str = "master";
pub const DEFAULT_TOKEN_ENV: &str = "CURATOR_CMA_TOKEN";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Provider limit on items per bulk action.
pub const DEFAULT_BULK_BATCH_SIZE: usize = 200;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// 1. Config document
// ---------------------------------------------------------------------------

/// Connection and run settings for one content store space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub space_id: String,
    #[serde(default = "default_environment")]
    pub environment_id: String,
    /// Webhook disabled around bulk publishes.
    pub webhook_id: String,
    /// Tag scoping imported entries to one season.
    #[serde(default = "default_generation_tag")]
    pub generation_tag: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_bulk_batch_size")]
    pub bulk_batch_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Config {
    /// Config with defaults for everything but the space and webhook.
    pub fn new(space_id: impl Into<String>, webhook_id: impl Into<String>) -> Self {
        Self {
            api_base: default_api_base(),
            space_id: space_id.into(),
            environment_id: default_environment(),
            webhook_id: webhook_id.into(),
            generation_tag: default_generation_tag(),
            token_env: default_token_env(),
            poll_interval_secs: default_poll_interval_secs(),
            bulk_batch_size: default_bulk_batch_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Read the bearer token from the configured environment variable.
    pub fn token(&self) -> Result<String, ConfigError> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ConfigError::MissingToken {
                var: self.token_env.clone(),
            }),
        }
    }

    /// `{api_base}/spaces/{space}/environments/{environment}/`
    pub fn environment_url(&self) -> String {
        format!(
            "{}/spaces/{}/environments/{}/",
            self.api_base.trim_end_matches('/'),
            self.space_id,
            self.environment_id
        )
    }

    /// `{api_base}/spaces/{space}/`: webhook definitions are space-scoped.
    pub fn space_url(&self) -> String {
        format!(
            "{}/spaces/{}/",
            self.api_base.trim_end_matches('/'),
            self.space_id
        )
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

fn default_generation_tag() -> String {
    format!("year{}", Utc::now().year())
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_bulk_batch_size() -> usize {
    DEFAULT_BULK_BATCH_SIZE
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

// ---------------------------------------------------------------------------
// 2. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.curator/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".curator").join("config.yaml")
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.curator/config.yaml`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 4. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the config.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    let path = config_path_at(home);
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// 5. Init
// ---------------------------------------------------------------------------

/// Scaffold `<home>/.curator/config.yaml`.
///
/// Idempotent: if the file already exists, loads and returns it unchanged.
pub fn init_at(
    home: &Path,
    space_id: &str,
    webhook_id: &str,
    generation_tag: Option<String>,
) -> Result<Config, ConfigError> {
    if config_path_at(home).exists() {
        return load_at(home);
    }

    let mut config = Config::new(space_id, webhook_id);
    if let Some(tag) = generation_tag {
        config.generation_tag = tag;
    }
    save_at(home, &config)?;
    Ok(config)
}

/// `init_at` convenience wrapper.
pub fn init(
    space_id: &str,
    webhook_id: &str,
    generation_tag: Option<String>,
) -> Result<Config, ConfigError> {
    init_at(&home()?, space_id, webhook_id, generation_tag)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
