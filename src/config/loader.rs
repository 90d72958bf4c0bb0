use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::session::Layout;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmuxConfig {
    pub layout: Option<Layout>,
    pub session_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub command: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relative paths are joined onto the repository root.
    pub worktrees_dir: PathBuf,
    pub default_base_branch: Option<String>,
    pub tmux: TmuxConfig,
    pub assistant: AssistantConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worktrees_dir: PathBuf::from("worktrees"),
            default_base_branch: None,
            tmux: TmuxConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = config_path.unwrap_or_else(Self::default_config_path);
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        if let Some(config_path) = std::env::var_os("WTM_CONFIG") {
            PathBuf::from(config_path)
        } else {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("wtm")
                .join("config.yaml")
        }
    }

    pub fn session_prefix(&self) -> Option<&str> {
        self.tmux.session_prefix.as_deref()
    }
}
