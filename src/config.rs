use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::gesture::{ComboSettings, GestureSettings};
use crate::input::{LogicalControl, RemapError, ShuttleLines, StickDirection, StickRemap};
use crate::menu::{CatalogContext, MenuCatalog};

const CONFIG_ENV: &str = "KIOSK_CONFIG";
const CONFIG_DIR: &str = "tricorder";
const CONFIG_FILE: &str = "kiosk.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, String),
    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Invalid stick remap: {0}")]
    Remap(#[from] RemapError),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct KioskConfig {
    pub gesture: GestureConfig,
    pub stick: StickConfig,
    pub shuttle: ShuttleConfig,
    pub runtime: RuntimeConfig,
    pub display: DisplayConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GestureConfig {
    pub long_press_threshold_ms: u64,
    pub combo_duration_ms: u64,
    pub combo_cooldown_ms: u64,
    pub combo_duration_options_s: Vec<u32>,
    // Root menu index the reveal combo needs; Settings entry when unset
    pub reveal_index: Option<usize>,
    // Holding the stick press at the root for the combo duration also reveals
    pub stick_hold_reveal: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press_threshold_ms: 600,
            combo_duration_ms: 3000,
            combo_cooldown_ms: 300,
            combo_duration_options_s: vec![1, 2, 3, 5, 8],
            reveal_index: None,
            stick_hold_reveal: true,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StickConfig {
    // physical -> logical
    pub remap: BTreeMap<StickDirection, StickDirection>,
}

impl Default for StickConfig {
    fn default() -> Self {
        Self {
            remap: BTreeMap::from([
                (StickDirection::Up, StickDirection::Left),
                (StickDirection::Left, StickDirection::Down),
                (StickDirection::Down, StickDirection::Right),
                (StickDirection::Right, StickDirection::Up),
                (StickDirection::Middle, StickDirection::Middle),
            ]),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ShuttleConfig {
    pub prev_line: u8,
    pub next_line: u8,
}

impl Default for ShuttleConfig {
    fn default() -> Self {
        Self {
            prev_line: 5,
            next_line: 6,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub frame_interval_ms: u64, // ~30 fps
    pub adapter_retry_ms: u64,
    pub stats_interval_s: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33,
            adapter_retry_ms: 1000,
            stats_interval_s: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub auto_cycle_interval_s: u32,
    pub auto_cycle_options_s: Vec<u32>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            auto_cycle_interval_s: 5,
            auto_cycle_options_s: vec![3, 5, 10, 15, 30],
        }
    }
}

impl KioskConfig {
    /// `$KIOSK_CONFIG`, else the per-user config directory.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        let mut base = dirs::config_dir().unwrap_or_else(|| {
            warn!("No config directory found, using current directory");
            PathBuf::from(".")
        });
        base.push(CONFIG_DIR);
        base.push(CONFIG_FILE);
        base
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e.to_string()))?;
        let config = Self::parse(&content)
            .map_err(|e| match e {
                ConfigError::Parse(_, msg) => ConfigError::Parse(path.to_path_buf(), msg),
                other => other,
            })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e.to_string()))?;
        config.validate()?;
        debug!("Config parsed: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gesture = &self.gesture;
        if gesture.long_press_threshold_ms == 0 {
            return Err(ConfigError::Invalid(
                "long_press_threshold_ms must be positive".to_string(),
            ));
        }
        // The duration menu works in whole seconds
        if gesture.combo_duration_ms == 0 || gesture.combo_duration_ms % 1000 != 0 {
            return Err(ConfigError::Invalid(format!(
                "combo_duration_ms must be a positive whole number of seconds, got {}",
                gesture.combo_duration_ms
            )));
        }
        if let Some(index) = gesture.reveal_index {
            let root_len = self.catalog().root().len();
            if index >= root_len {
                return Err(ConfigError::Invalid(format!(
                    "reveal_index {} is outside the root menu ({} entries)",
                    index, root_len
                )));
            }
        }
        if gesture.combo_duration_options_s.is_empty() {
            return Err(ConfigError::Invalid(
                "combo_duration_options_s must not be empty".to_string(),
            ));
        }
        if self.display.auto_cycle_options_s.is_empty() {
            return Err(ConfigError::Invalid(
                "auto_cycle_options_s must not be empty".to_string(),
            ));
        }
        if self.shuttle.prev_line == self.shuttle.next_line {
            return Err(ConfigError::Invalid(format!(
                "shuttle lines must differ, both are {}",
                self.shuttle.prev_line
            )));
        }
        if self.runtime.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "frame_interval_ms must be positive".to_string(),
            ));
        }
        self.stick_remap()?;
        Ok(())
    }

    pub fn stick_remap(&self) -> Result<StickRemap, ConfigError> {
        Ok(StickRemap::from_table(self.stick.remap.clone())?)
    }

    pub fn shuttle_lines(&self) -> ShuttleLines {
        ShuttleLines {
            prev_line: self.shuttle.prev_line,
            next_line: self.shuttle.next_line,
        }
    }

    pub fn catalog(&self) -> MenuCatalog {
        MenuCatalog::default()
            .with_combo_options(self.gesture.combo_duration_options_s.clone())
            .with_auto_cycle_options(self.display.auto_cycle_options_s.clone())
    }

    pub fn catalog_context(&self) -> CatalogContext {
        CatalogContext {
            combo_duration_s: (self.gesture.combo_duration_ms / 1000) as u32,
            auto_cycle_s: self.display.auto_cycle_interval_s,
        }
    }

    pub fn gesture_settings(&self, catalog: &MenuCatalog) -> GestureSettings {
        let defaults = ComboSettings::default();
        let reveal_index = self
            .gesture
            .reveal_index
            .or_else(|| catalog.default_reveal_index())
            .unwrap_or(defaults.reveal_index);
        GestureSettings {
            long_press_threshold: millis(self.gesture.long_press_threshold_ms),
            combo: ComboSettings {
                duration: millis(self.gesture.combo_duration_ms),
                cooldown: millis(self.gesture.combo_cooldown_ms),
                reveal_index,
                ..defaults
            },
            hold_reveal: self
                .gesture
                .stick_hold_reveal
                .then_some(LogicalControl::StickPress),
        }
    }

    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.runtime.frame_interval_ms)
    }

    pub fn adapter_retry(&self) -> Duration {
        millis(self.runtime.adapter_retry_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::seconds(self.runtime.stats_interval_s as i64)
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(ms as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = KioskConfig::parse("").unwrap();
        assert_eq!(config, KioskConfig::default());
        let settings = config.gesture_settings(&config.catalog());
        assert_eq!(settings.long_press_threshold, Duration::milliseconds(600));
        assert_eq!(settings.combo.reveal_index, 4);
        assert_eq!(config.catalog_context().combo_duration_s, 3);
    }

    #[test]
    fn sections_override_defaults() {
        let config = KioskConfig::parse(
            r#"
            [gesture]
            long_press_threshold_ms = 800
            reveal_index = 2

            [stick.remap]
            up = "up"
            down = "down"
            left = "left"
            right = "right"
            middle = "middle"

            [runtime]
            frame_interval_ms = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.gesture.long_press_threshold_ms, 800);
        assert_eq!(config.gesture.combo_duration_ms, 3000);
        assert_eq!(config.gesture_settings(&config.catalog()).combo.reveal_index, 2);
        assert_eq!(
            config.stick_remap().unwrap().logical(StickDirection::Up),
            Some(StickDirection::Up)
        );
        assert_eq!(config.frame_interval(), std::time::Duration::from_millis(20));
    }

    #[test]
    fn duplicate_stick_target_is_rejected() {
        let result = KioskConfig::parse(
            r#"
            [stick.remap]
            up = "left"
            down = "left"
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::Remap(RemapError::DuplicateTarget {
                logical: StickDirection::Left,
                ..
            }))
        ));
    }

    #[test]
    fn reveal_index_past_root_menu_is_rejected() {
        let result = KioskConfig::parse(
            r#"
            [gesture]
            reveal_index = 5
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let config = KioskConfig::parse("[gesture]\nreveal_index = 4").unwrap();
        assert_eq!(config.gesture_settings(&config.catalog()).combo.reveal_index, 4);
    }

    #[test]
    fn combo_duration_must_be_whole_seconds() {
        let result = KioskConfig::parse("[gesture]\ncombo_duration_ms = 2500");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let config = KioskConfig::parse("[gesture]\ncombo_duration_ms = 5000").unwrap();
        assert_eq!(config.catalog_context().combo_duration_s, 5);
    }

    #[test]
    fn stick_hold_reveal_can_be_disabled() {
        let settings = KioskConfig::default().gesture_settings(&MenuCatalog::default());
        assert_eq!(settings.hold_reveal, Some(LogicalControl::StickPress));

        let config = KioskConfig::parse("[gesture]\nstick_hold_reveal = false").unwrap();
        assert_eq!(config.gesture_settings(&config.catalog()).hold_reveal, None);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let result = KioskConfig::parse("[gesture\nlong_press_threshold_ms = ");
        assert!(matches!(result, Err(ConfigError::Parse(_, _))));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = KioskConfig::load_from(Path::new("/nonexistent/tricorder/kiosk.toml")).unwrap();
        assert_eq!(config, KioskConfig::default());
    }
}
