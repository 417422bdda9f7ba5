//! Host configuration, read from `trellis.toml`.
//!
//! ```toml
//! [script]
//! entry = "app.rhai"
//! max_operations = 1000000
//!
//! [ui]
//! frame_interval_ms = 16
//!
//! [log]
//! filter = "trellis=debug"
//! ```
//!
//! Every section and field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use trellis_script::ExecutorConfig;
use trellis_ui::UiManagerConfig;

const CONFIG_DIR: &str = "trellis";
const CONFIG_FILE: &str = "trellis.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub script: ScriptSection,
    pub ui: UiSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSection {
    /// Script run when the CLI is given none.
    pub entry: Option<PathBuf>,
    /// Zero means unlimited.
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
}

impl Default for ScriptSection {
    fn default() -> Self {
        let engine = ExecutorConfig::default();
        Self {
            entry: None,
            max_operations: engine.max_operations,
            max_call_levels: engine.max_call_levels,
            max_expr_depth: engine.max_expr_depth,
            max_string_size: engine.max_string_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSection {
    pub frame_interval_ms: u64,
    pub reset_layout_animation_after_batch: bool,
    /// Size of the root view the CLI mounts.
    pub root_width: f64,
    pub root_height: f64,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            reset_layout_animation_after_batch: true,
            root_width: 800.0,
            root_height: 600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// `tracing_subscriber::EnvFilter` directives. `RUST_LOG` wins.
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// `<config dir>/trellis/trellis.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Loads the default file, or defaults when it does not exist.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            max_operations: self.script.max_operations,
            max_call_levels: self.script.max_call_levels,
            max_expr_depth: self.script.max_expr_depth,
            max_string_size: self.script.max_string_size,
        }
    }

    pub fn ui_config(&self) -> UiManagerConfig {
        UiManagerConfig {
            frame_interval: Duration::from_millis(self.ui.frame_interval_ms.max(1)),
            reset_layout_animation_after_batch: self.ui.reset_layout_animation_after_batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = HostConfig::parse("").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.executor_config(), ExecutorConfig::default());
        assert_eq!(config.ui_config(), UiManagerConfig::default());
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = HostConfig::parse(
            r#"
            [script]
            entry = "app.rhai"
            max_operations = 5000

            [ui]
            frame_interval_ms = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.script.entry, Some(PathBuf::from("app.rhai")));
        assert_eq!(config.executor_config().max_operations, 5000);
        assert_eq!(config.executor_config().max_call_levels, 64);
        assert_eq!(config.ui_config().frame_interval, Duration::from_millis(8));
        assert!(config.ui_config().reset_layout_animation_after_batch);
        assert_eq!(config.log, LogSection::default());
    }

    #[test]
    fn test_zero_frame_interval_is_clamped() {
        let config = HostConfig::parse("[ui]\nframe_interval_ms = 0").unwrap();
        assert_eq!(config.ui_config().frame_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        assert!(HostConfig::parse("[ui]\nframe_interval_ms = \"fast\"").is_err());
    }
}
