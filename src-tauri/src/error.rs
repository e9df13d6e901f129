use std::{io, result::Result as StdResult};

use thiserror::Error;

use crate::coordinates::CoordinateRole;

/// Convenient result type for the crate.
pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Start was requested while points needed by the current settings are unset.
    #[error("Coordinates not set: {}", format_roles(.0))]
    MissingCoordinates(Vec<CoordinateRole>),

    /// A synthetic mouse or keyboard action failed.
    #[error("Input error: {0}")]
    Input(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Registering or removing the global key hook failed.
    #[error("Hotkey error: {0}")]
    Hotkey(String),

    #[error("Invalid hotkey: {0}")]
    InvalidHotkey(String),

    /// The run flag was lowered; the current step stopped at a checkpoint.
    #[error("Run stopped")]
    Interrupted,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_roles(roles: &[CoordinateRole]) -> String {
    roles
        .iter()
        .map(|role| role.label())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }
}
