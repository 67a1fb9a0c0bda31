//! App configuration: where the Response Store web app lives and the
//! shared teacher key.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 25;
const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;

/// examsheet configuration.
///
/// Note: Custom Debug impl masks the teacher key to prevent accidental
/// exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Base URL of the Response Store web app.
    #[serde(default)]
    pub webapp_url: String,
    /// Shared instructor secret for `set_active_exam`.
    #[serde(default)]
    pub teacher_key: String,
    /// Deadline for read actions, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Deadline for the `submit` action, in seconds.
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_submit_timeout() -> u64 {
    DEFAULT_SUBMIT_TIMEOUT_SECS
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            webapp_url: String::new(),
            teacher_key: String::new(),
            timeout_secs: default_timeout(),
            submit_timeout_secs: default_submit_timeout(),
        }
    }
}

impl std::fmt::Debug for SheetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetConfig")
            .field("webapp_url", &self.webapp_url)
            .field("teacher_key", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .field("submit_timeout_secs", &self.submit_timeout_secs)
            .finish()
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examsheet.toml` in the current directory
/// 2. `~/.config/examsheet/config.toml`
///
/// Environment variable overrides: `EXAMSHEET_WEBAPP_URL`,
/// `EXAMSHEET_TEACHER_KEY`.
pub fn load_config() -> Result<SheetConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<SheetConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examsheet.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<SheetConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => SheetConfig::default(),
    };

    // Apply env var overrides
    if let Ok(url) = std::env::var("EXAMSHEET_WEBAPP_URL") {
        config.webapp_url = url;
    }
    if let Ok(key) = std::env::var("EXAMSHEET_TEACHER_KEY") {
        config.teacher_key = key;
    }

    config.webapp_url = resolve_env_vars(config.webapp_url.trim()).trim().to_string();
    config.teacher_key = resolve_env_vars(config.teacher_key.trim()).trim().to_string();

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examsheet"))
}
