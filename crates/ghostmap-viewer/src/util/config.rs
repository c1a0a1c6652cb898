use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::graph::layout::LayoutStrategyKind;
use crate::graph::timeline::PlaybackSpeed;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub api_base: String,
    pub default_strategy: LayoutStrategyKind,
    pub default_speed: PlaybackSpeed,
    pub ghost_poll_ms: u64,
    pub request_timeout_ms: u64,
    pub auto_play: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            default_strategy: LayoutStrategyKind::PathGrouped,
            default_speed: PlaybackSpeed::X1,
            ghost_poll_ms: 2000,
            request_timeout_ms: 10_000,
            auto_play: false,
        }
    }
}

impl ViewerConfig {
    pub fn ghost_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ghost_poll_ms.max(250))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(100))
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "ghostmap")?;
    Some(proj.config_dir().join("viewer.toml"))
}

pub fn load_or_default() -> ViewerConfig {
    let Some(path) = config_file_path() else {
        return ViewerConfig::default();
    };
    load_or_default_from_path(&path)
}

fn load_or_default_from_path(path: &Path) -> ViewerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ViewerConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable viewer config");
        ViewerConfig::default()
    })
}

pub fn save(cfg: &ViewerConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

fn save_to_path(cfg: &ViewerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize viewer config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write viewer config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn viewer_config_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("viewer.toml");
        let cfg = ViewerConfig {
            api_base: "http://scanner.local:8080".to_string(),
            default_strategy: LayoutStrategyKind::GlobalPathGrouped,
            default_speed: PlaybackSpeed::X5,
            auto_play: true,
            ..ViewerConfig::default()
        };

        save_to_path(&cfg, &path).expect("save config");
        let loaded = load_or_default_from_path(&path);

        assert_eq!(cfg, loaded);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "default_strategy = \"direct_tree\"\ndefault_speed = \"2\"\n").unwrap();

        let loaded = load_or_default_from_path(&path);
        assert_eq!(loaded.default_strategy, LayoutStrategyKind::DirectTree);
        assert_eq!(loaded.default_speed, PlaybackSpeed::X2);
        assert_eq!(loaded.api_base, DEFAULT_API_BASE);
        assert_eq!(loaded.ghost_poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "default_speed = \"3\"").unwrap();
        assert_eq!(load_or_default_from_path(&path), ViewerConfig::default());
        assert_eq!(
            load_or_default_from_path(&dir.path().join("missing.toml")),
            ViewerConfig::default()
        );
    }
}
