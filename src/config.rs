use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diff::RendererChoice;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub renderer: RendererChoice,
    pub difft_path: Option<PathBuf>,
    pub color: bool,
    pub tick_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            renderer: RendererChoice::Auto,
            difft_path: None,
            color: true,
            tick_rate_ms: 50,
        }
    }
}

impl Config {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }

    /// `NO_COLOR` with any value turns color off.
    pub fn apply_env(mut self, no_color: Option<&str>) -> Self {
        if no_color.is_some() {
            self.color = false;
        }
        self
    }
}

/// `<config_dir>/rift/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rift")
        .join("config.json")
}

/// Load config from disk. Returns defaults on missing or corrupt file.
pub async fn load_config(path: &Path) -> Config {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}
