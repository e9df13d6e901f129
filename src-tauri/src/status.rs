use chrono::Local;
use log::Level;
use serde::Serialize;
use std::collections::VecDeque;
use tauri::{AppHandle, Emitter};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tauri_plugin_notification::NotificationExt;

use crate::automation::events::{RunSummary, StopReason};
use crate::state::RunState;

/// Lines kept for `get_status_log`.
pub const STATUS_HISTORY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

impl From<Level> for StatusLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => StatusLevel::Error,
            Level::Warn => StatusLevel::Warn,
            Level::Info | Level::Debug | Level::Trace => StatusLevel::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    /// Local wall-clock time, `HH:MM:SS`.
    pub timestamp: String,
    pub level: StatusLevel,
    pub message: String,
}

impl StatusLine {
    pub fn now(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            level: level.into(),
            message: message.into(),
        }
    }
}

/// Bounded history of status lines, oldest dropped first.
#[derive(Debug)]
pub struct StatusLog {
    lines: VecDeque<StatusLine>,
    capacity: usize,
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::with_capacity(STATUS_HISTORY)
    }
}

impl StatusLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: StatusLine) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> Vec<StatusLine> {
        self.lines.iter().cloned().collect()
    }
}

/// Where the foreground shows what is going on.
pub trait StatusSink: Send + Sync {
    fn publish(&self, line: &StatusLine);
    fn run_state_changed(&self, state: RunState);
    fn run_finished(&self, reason: &StopReason, summary: &RunSummary);
    /// A start request was refused; the operator has to act on it.
    fn alert(&self, message: &str);
}

/// Webview events, tray tooltip, notification and dialog.
pub struct TauriSink {
    app: AppHandle,
}

impl TauriSink {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl StatusSink for TauriSink {
    fn publish(&self, line: &StatusLine) {
        let _ = self.app.emit("status-line", line);
    }

    fn run_state_changed(&self, state: RunState) {
        let _ = self.app.emit("run-state-changed", state);
        crate::system::tray::show_run_state(&self.app, state);
    }

    fn run_finished(&self, reason: &StopReason, summary: &RunSummary) {
        let body = format!(
            "{} ({} translated, {} skipped, {} failed)",
            reason, summary.translated, summary.skipped, summary.failed
        );
        if let Err(e) = self
            .app
            .notification()
            .builder()
            .title("Translation finished")
            .body(body)
            .show()
        {
            log::debug!("Failed to show notification: {}", e);
        }
    }

    fn alert(&self, message: &str) {
        self.app
            .dialog()
            .message(message)
            .title("Cannot start translation")
            .kind(MessageDialogKind::Error)
            .show(|_| {});
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_drops_oldest_lines() {
        let mut log = StatusLog::with_capacity(3);
        for n in 0..5 {
            log.push(StatusLine::now(Level::Info, format!("line {}", n)));
        }
        let messages: Vec<_> = log.lines().into_iter().map(|l| l.message).collect();
        assert_eq!(messages, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn lines_carry_clock_time_and_level() {
        let line = StatusLine::now(Level::Warn, "careful");
        assert_eq!(line.timestamp.len(), 8);
        assert_eq!(line.timestamp.as_bytes()[2], b':');
        assert_eq!(line.level, StatusLevel::Warn);
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["level"], "warn");
    }
}
