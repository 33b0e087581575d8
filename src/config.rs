//! GUI framework settings, read from a YAML file.
//!
//! Every field has a default, so an empty document is a valid config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::ids::is_valid_id;
use crate::lang::Language;

/// Longest allowed per-player inactivity timeout (one day).
pub const MAX_PER_PLAYER_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Main framework configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuiConfig {
    // ============================================
    // Languages
    // ============================================
    /// Language every layout must carry a title for
    #[serde(default = "default_main_language")]
    pub main_language: Language,

    /// Optional `key: value` lang file for framework messages
    #[serde(default)]
    pub lang_file: Option<String>,

    // ============================================
    // Layouts
    // ============================================
    #[serde(default = "default_layouts_dir")]
    pub layouts_dir: String,

    /// Layouts that are built and registered at startup
    #[serde(default)]
    pub preload: Vec<String>,

    // ============================================
    // Instances
    // ============================================
    /// Inactivity timeout before a per-player instance is evicted (seconds)
    #[serde(default = "default_per_player_timeout_secs")]
    pub per_player_timeout_secs: u64,

    /// Minimum time between two icon clicks of one player (ms, 0 = off)
    #[serde(default)]
    pub click_cooldown_ms: u64,

    /// Perform layout open actions (messages + sound) on open
    #[serde(default = "default_open_actions_enabled")]
    pub open_actions_enabled: bool,
}

// ============================================
// Defaults
// ============================================

fn default_main_language() -> Language {
    Language::new("en")
}

fn default_layouts_dir() -> String {
    "./layouts/".to_string()
}

fn default_per_player_timeout_secs() -> u64 {
    300
}

fn default_open_actions_enabled() -> bool {
    true
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            main_language: default_main_language(),
            lang_file: None,
            layouts_dir: default_layouts_dir(),
            preload: Vec::new(),
            per_player_timeout_secs: default_per_player_timeout_secs(),
            click_cooldown_ms: 0,
            open_actions_enabled: default_open_actions_enabled(),
        }
    }
}

impl GuiConfig {
    /// Read and validate `path`.
    ///
    /// ```no_run
    /// use invgui::config::GuiConfig;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = GuiConfig::from_file("conf/gui.yaml")?;
    /// println!("layouts in {}", config.layouts_dir);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Cannot read GUI config {}", path.display()))?;
        Self::from_str(&contents).with_context(|| format!("Invalid GUI config {}", path.display()))
    }

    pub fn from_str(contents: &str) -> Result<Self> {
        let config: GuiConfig = serde_yaml::from_str(contents).context("GUI config is not valid YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.main_language.code().is_empty(),
            "main_language cannot be empty"
        );
        anyhow::ensure!(!self.layouts_dir.is_empty(), "layouts_dir cannot be empty");

        anyhow::ensure!(
            self.per_player_timeout_secs > 0,
            "per_player_timeout_secs must be positive"
        );
        anyhow::ensure!(
            self.per_player_timeout_secs <= MAX_PER_PLAYER_TIMEOUT_SECS,
            "per_player_timeout_secs too large: {} (max {})",
            self.per_player_timeout_secs,
            MAX_PER_PLAYER_TIMEOUT_SECS
        );

        for id in &self.preload {
            anyhow::ensure!(is_valid_id(id), "Invalid preload layout id: {:?}", id);
        }

        Ok(())
    }

    pub fn per_player_timeout(&self) -> Duration {
        Duration::from_secs(self.per_player_timeout_secs)
    }

    pub fn click_cooldown(&self) -> Duration {
        Duration::from_millis(self.click_cooldown_ms)
    }

    /// Write the config back as YAML, defaults included.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Cannot serialize GUI config")?;
        fs::write(path, yaml).with_context(|| format!("Cannot write GUI config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GuiConfig::from_str("{}").unwrap();

        assert_eq!(config.main_language, Language::new("en"));
        assert_eq!(config.layouts_dir, "./layouts/");
        assert_eq!(config.per_player_timeout_secs, 300);
        assert_eq!(config.click_cooldown_ms, 0);
        assert!(config.open_actions_enabled);
        assert!(config.preload.is_empty());
        assert!(config.lang_file.is_none());
    }

    #[test]
    fn test_full_config() {
        let config_str = r#"
main_language: DE
lang_file: "conf/gui_de.txt"
layouts_dir: "./data/layouts/"
preload:
  - main
  - warps
per_player_timeout_secs: 60
click_cooldown_ms: 250
open_actions_enabled: false
"#;

        let config = GuiConfig::from_str(config_str).unwrap();
        assert_eq!(config.main_language, Language::new("de"));
        assert_eq!(config.lang_file.as_deref(), Some("conf/gui_de.txt"));
        assert_eq!(config.preload, vec!["main", "warps"]);
        assert_eq!(config.per_player_timeout(), Duration::from_secs(60));
        assert_eq!(config.click_cooldown(), Duration::from_millis(250));
        assert!(!config.open_actions_enabled);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = GuiConfig::from_str("per_player_timeout_secs: 0");
        assert!(result.is_err());

        let err_msg = format!("{}", result.unwrap_err());
        assert!(err_msg.contains("per_player_timeout_secs"));
    }

    #[test]
    fn test_bad_preload_id_rejected() {
        let result = GuiConfig::from_str("preload: [\"bad id\"]");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_type() {
        let result = GuiConfig::from_str("click_cooldown_ms: \"soon\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = GuiConfig::from_str("main_language: [this is not valid yaml");
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load() {
        let config = GuiConfig::from_str("per_player_timeout_secs: 42").unwrap();

        let temp_file = std::env::temp_dir().join("invgui_test_save_config.yaml");

        config.save(&temp_file).unwrap();
        let loaded = GuiConfig::from_file(&temp_file).unwrap();

        assert_eq!(loaded.per_player_timeout_secs, 42);
        assert_eq!(loaded.main_language, config.main_language);

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_file_errors_name_the_path() {
        let dir = std::env::temp_dir().join("invgui_test_config_errors");
        std::fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("missing.yaml");
        let err = format!("{:#}", GuiConfig::from_file(&missing).unwrap_err());
        assert!(err.contains("missing.yaml"));

        let invalid = dir.join("invalid.yaml");
        std::fs::write(&invalid, "per_player_timeout_secs: 0").unwrap();
        let err = format!("{:#}", GuiConfig::from_file(&invalid).unwrap_err());
        assert!(err.contains("invalid.yaml"));
        assert!(err.contains("per_player_timeout_secs"));

        std::fs::remove_dir_all(dir).ok();
    }
}
