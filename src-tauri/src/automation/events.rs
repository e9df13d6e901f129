use log::Level;
use serde::Serialize;
use std::fmt;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail")]
pub enum StopReason {
    /// The source box came back empty.
    NoMoreContent,
    /// The same source text was seen on three consecutive fields. This is a
    /// heuristic for "Poedit stayed on the last entry"; two genuinely identical
    /// neighbouring entries can trigger it early.
    NaturalCompletion,
    /// The operator stopped the run.
    StopRequested,
    /// Too many fields failed in a row.
    TooManyFailures(u32),
    /// The worker could not start or panicked.
    Faulted(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NoMoreContent => {
                write!(f, "no source text found, all entries may be done")
            }
            StopReason::NaturalCompletion => {
                write!(f, "same source text seen 3 times in a row, translation finished")
            }
            StopReason::StopRequested => write!(f, "stopped by operator"),
            StopReason::TooManyFailures(n) => write!(f, "{} fields failed in a row", n),
            StopReason::Faulted(msg) => write!(f, "worker failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Fields visited, including skipped and repeated ones.
    pub fields: usize,
    /// Texts sent to the translation service.
    pub dispatched: usize,
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Progress reported by the background loop to the foreground.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status {
        level: Level,
        message: String,
    },
    FieldTranslated {
        field: usize,
        source: String,
        translation: String,
        best_effort: bool,
    },
    FieldSkipped {
        field: usize,
    },
    FieldFailed {
        field: usize,
        reason: String,
    },
    Finished {
        reason: StopReason,
        summary: RunSummary,
    },
}

const PREVIEW_CHARS: usize = 50;

/// First characters of `text`, for status lines.
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

impl ProgressEvent {
    pub fn info(message: impl Into<String>) -> Self {
        ProgressEvent::Status {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        ProgressEvent::Status {
            level: Level::Warn,
            message: message.into(),
        }
    }

    /// Human-readable status line for the event.
    pub fn describe(&self) -> (Level, String) {
        match self {
            ProgressEvent::Status { level, message } => (*level, message.clone()),
            ProgressEvent::FieldTranslated {
                field,
                translation,
                best_effort,
                ..
            } => {
                let note = if *best_effort { " (best effort)" } else { "" };
                (
                    Level::Info,
                    format!("#{} translated{}: {}", field, note, preview(translation)),
                )
            }
            ProgressEvent::FieldSkipped { field } => {
                (Level::Info, format!("#{} already translated, skipped", field))
            }
            ProgressEvent::FieldFailed { field, reason } => {
                (Level::Warn, format!("#{} failed: {}", field, reason))
            }
            ProgressEvent::Finished { reason, summary } => (
                Level::Info,
                format!(
                    "Run finished: {} ({} translated, {} skipped, {} failed)",
                    reason, summary.translated, summary.skipped, summary.failed
                ),
            ),
        }
    }
}
