pub mod dashboard;
pub mod exams;
pub mod init;
pub mod set_active;
pub mod submit;

use std::path::Path;

use anyhow::{Context, Result};

use examsheet_store::{load_config_from, SheetConfig, WebAppStore};

/// Load the config and build the web app client every command talks to.
pub fn connect(config_path: Option<&Path>) -> Result<(SheetConfig, WebAppStore)> {
    let config = load_config_from(config_path).context("failed to load configuration")?;
    if config.webapp_url.is_empty() {
        anyhow::bail!(
            "webapp_url is not set. Run `examsheet init` and edit examsheet.toml, \
             or set EXAMSHEET_WEBAPP_URL"
        );
    }
    let store = WebAppStore::from_config(&config);
    Ok((config, store))
}
