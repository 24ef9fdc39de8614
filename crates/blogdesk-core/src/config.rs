use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use blogdesk_client::api::LoginStyle;
use blogdesk_client::ClientConfig;
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "console.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub login_style: LoginStyle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding `session.json`; `$HOME/.config/blogdesk` when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(flatten)]
    pub client: ClientConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Route table file, relative to the config directory.
    #[serde(default)]
    pub routes: Option<PathBuf>,
}

impl ConsoleConfig {
    pub fn routes_path(&self, config_dir: &Path) -> Option<PathBuf> {
        self.routes.as_ref().map(|p| config_dir.join(p))
    }

    pub fn session_dir(&self, config_dir: &Path) -> Option<PathBuf> {
        self.session.dir.as_ref().map(|p| config_dir.join(p))
    }
}

/// Load `console.yaml` from `config_dir`. A missing file yields the defaults.
pub fn load_config(config_dir: &Path) -> Result<ConsoleConfig> {
    let path = config_dir.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!("{} not found, using default config", path.display());
        return Ok(ConsoleConfig::default());
    }

    let content =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(ConsoleConfig::default());
    }
    serde_yaml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
