use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::automation::copy_method::CopyMethod;
use crate::coordinates::{self, CoordinateRegistry, CoordinateRole};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub coordinates: CoordinateRegistry,
    /// Leave entries that already have a translation alone.
    pub skip_translated: bool,
    /// Time the service gets before the first result sample.
    #[serde(alias = "translation_wait_time")]
    pub translation_wait_ms: u64,
    pub consistency_check: bool,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub copy_method: CopyMethod,
    pub use_gesture: bool,
    pub gesture_wait_ms: u64,
    pub gesture_distance: i32,
    pub newline_conversion: bool,
    pub start_hotkey: String,
    #[serde(alias = "hotkey_combination")]
    pub stop_hotkey: String,
    /// Pause after every synthetic click or key chord.
    pub action_delay_ms: u64,
    pub max_consecutive_failures: u32,
    pub clipboard_snapshots: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            coordinates: CoordinateRegistry::default(),
            skip_translated: true,
            translation_wait_ms: 3000,
            consistency_check: true,
            poll_attempts: 5,
            poll_interval_ms: 500,
            copy_method: CopyMethod::Button,
            use_gesture: false,
            gesture_wait_ms: 500,
            gesture_distance: 300,
            newline_conversion: false,
            start_hotkey: "f8".to_string(),
            stop_hotkey: "f9".to_string(),
            action_delay_ms: 50,
            max_consecutive_failures: 5,
            clipboard_snapshots: true,
        }
    }
}

impl Settings {
    pub fn file_path(data_dir: &Path) -> PathBuf {
        data_dir.join("settings.json")
    }

    pub fn load(data_dir: &Path) -> Self {
        let path = Self::file_path(data_dir);
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(settings) => return settings,
                    Err(e) => log::warn!("Failed to parse settings: {}, using defaults", e),
                },
                Err(e) => log::warn!("Failed to read settings: {}, using defaults", e),
            }
        }
        Self::default()
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::file_path(data_dir), json)?;
        Ok(())
    }

    /// Points a run needs with the current copy method and gesture setting.
    pub fn required_roles(&self) -> Vec<CoordinateRole> {
        coordinates::required_roles(self.copy_method, self.use_gesture)
    }
}
