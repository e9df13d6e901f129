use directories::ProjectDirs;
use std::path::PathBuf;

use crate::error::{Error, Result};

const SNAPSHOT_FILE: &str = "poedit_clipboard_history.json";

pub struct AppConfig {
    pub data_dir: PathBuf,
    pub snapshot_path: PathBuf,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "poedit-autotranslate", "PoeditAutoTranslate")
            .ok_or_else(|| Error::Config("Failed to determine project directories".to_string()))?;
        Ok(Self {
            data_dir: proj_dirs.data_dir().to_path_buf(),
            snapshot_path: std::env::temp_dir().join(SNAPSHOT_FILE),
        })
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
