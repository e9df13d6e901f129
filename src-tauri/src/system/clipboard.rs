use arboard::Clipboard;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// The single system clipboard slot, the only data channel to both applications.
pub trait ClipboardBridge {
    /// Current text content; an empty or non-text clipboard reads as "".
    fn read_text(&mut self) -> Result<String>;
    fn write_text(&mut self, text: &str) -> Result<()>;
}

pub struct ArboardClipboard {
    clipboard: Clipboard,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self> {
        let clipboard =
            Clipboard::new().map_err(|e| Error::Clipboard(format!("Failed to open clipboard: {}", e)))?;
        Ok(Self { clipboard })
    }
}

impl ClipboardBridge for ArboardClipboard {
    fn read_text(&mut self) -> Result<String> {
        match self.clipboard.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(Error::Clipboard(format!("Failed to read clipboard text: {}", e))),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.clipboard
            .set_text(text)
            .map_err(|e| Error::Clipboard(format!("Failed to set clipboard text: {}", e)))
    }
}

/// Remembers the last clipboard value seen, to tell when it actually changed.
#[derive(Debug, Default)]
pub struct ClipboardMonitor {
    last_content: String,
}

impl ClipboardMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank content never counts as a change.
    pub fn is_content_changed(&self, content: &str) -> bool {
        if content.trim().is_empty() {
            return false;
        }
        content != self.last_content
    }

    pub fn update_last_content(&mut self, content: &str) {
        self.last_content.clear();
        self.last_content.push_str(content);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Source,
    Target,
}

/// Last clipboard value the run cared about. Diagnostics only, never read by the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardSnapshot {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: SnapshotKind,
    #[serde(rename = "timestamp")]
    pub captured_at: DateTime<Local>,
}

/// JSON file holding the most recent [`ClipboardSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save(&self, content: &str, kind: SnapshotKind) -> Result<()> {
        let snapshot = ClipboardSnapshot {
            content: content.to_string(),
            kind,
            captured_at: Local::now(),
        };
        let json = serde_json::to_string(&snapshot)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn load(&self) -> Option<ClipboardSnapshot> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("Failed to parse clipboard snapshot {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Best-effort removal at shutdown.
    pub fn cleanup(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log::warn!("Failed to remove clipboard snapshot {:?}: {}", self.path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_is_never_a_change() {
        let mut monitor = ClipboardMonitor::new();
        assert!(!monitor.is_content_changed("   \n"));
        assert!(monitor.is_content_changed("Hallo"));
        monitor.update_last_content("Hallo");
        assert!(!monitor.is_content_changed("Hallo"));
        assert!(monitor.is_content_changed("Hallo Welt"));
    }

    #[test]
    fn snapshot_store_round_trips_and_cleans_up() {
        let path = std::env::temp_dir().join(format!(
            "poedit_autotranslate_snapshot_test_{}.json",
            std::process::id()
        ));
        let store = SnapshotStore::new(path.clone());
        store.save("Open file", SnapshotKind::Source).unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.content, "Open file");
        assert_eq!(snapshot.kind, SnapshotKind::Source);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["type"], "source");

        store.cleanup();
        assert!(!path.exists());
        assert!(store.load().is_none());
    }
}
