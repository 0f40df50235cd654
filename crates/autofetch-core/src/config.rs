use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::http_request::HTTP_REQUEST_PROG_ID;

/// Global configuration loaded from `~/.config/autofetch/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutofetchConfig {
    /// Well-known name of the automation class that performs the request.
    pub prog_id: String,
    /// Environment variable holding the base directory for the artifact.
    pub base_dir_env: String,
    /// Artifact file name inside the base directory.
    pub file_name: String,
    /// Name of the startup entry.
    pub startup_entry: String,
    /// Program that opens the artifact at session start.
    pub launcher: String,
    /// Seconds the CLI waits after a successful run before exiting.
    pub linger_secs: u64,
}

impl Default for AutofetchConfig {
    fn default() -> Self {
        Self {
            prog_id: HTTP_REQUEST_PROG_ID.to_string(),
            base_dir_env: "HOME".to_string(),
            file_name: "checkme.png".to_string(),
            startup_entry: "OpenImage".to_string(),
            launcher: "xdg-open".to_string(),
            linger_secs: 0,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("autofetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AutofetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = AutofetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AutofetchConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
