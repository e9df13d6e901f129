use std::thread;
use std::time::Duration;

use crate::coordinates::CoordinatePoint;
use crate::error::{Error, Result};
use crate::state::RunFlag;
use crate::system::clipboard::ClipboardBridge;
use crate::system::input::{InputDriver, KeyChord};

/// Input driver and clipboard as one unit of automation. Every primitive checks
/// the run flag first and pauses for `action_delay` afterwards.
pub struct Desktop {
    input: Box<dyn InputDriver>,
    clipboard: Box<dyn ClipboardBridge>,
    flag: RunFlag,
    action_delay: Duration,
}

impl Desktop {
    pub fn new(
        input: Box<dyn InputDriver>,
        clipboard: Box<dyn ClipboardBridge>,
        flag: RunFlag,
        action_delay: Duration,
    ) -> Self {
        Self {
            input,
            clipboard,
            flag,
            action_delay,
        }
    }

    /// `Err(Interrupted)` once the run flag is lowered.
    pub fn checkpoint(&self) -> Result<()> {
        if self.flag.is_raised() {
            Ok(())
        } else {
            Err(Error::Interrupted)
        }
    }

    /// Timed suspension. Not cancellable mid-wait.
    pub fn wait(&self, duration: Duration) -> Result<()> {
        self.checkpoint()?;
        if !duration.is_zero() {
            thread::sleep(duration);
        }
        Ok(())
    }

    fn pause(&self) {
        if !self.action_delay.is_zero() {
            thread::sleep(self.action_delay);
        }
    }

    pub fn click(&mut self, at: CoordinatePoint, count: u32) -> Result<()> {
        self.checkpoint()?;
        log::debug!("click x{} at ({}, {})", count, at.x, at.y);
        self.input.click(at, count)?;
        self.pause();
        Ok(())
    }

    pub fn drag(&mut self, from: CoordinatePoint, to: CoordinatePoint) -> Result<()> {
        self.checkpoint()?;
        log::debug!("drag ({}, {}) -> ({}, {})", from.x, from.y, to.x, to.y);
        self.input.drag(from, to)?;
        self.pause();
        Ok(())
    }

    pub fn chord(&mut self, chord: KeyChord) -> Result<()> {
        self.checkpoint()?;
        log::debug!("chord {:?}", chord);
        self.input.chord(chord)?;
        self.pause();
        Ok(())
    }

    pub fn read_clipboard(&mut self) -> Result<String> {
        self.checkpoint()?;
        self.clipboard.read_text()
    }

    pub fn write_clipboard(&mut self, text: &str) -> Result<()> {
        self.checkpoint()?;
        self.clipboard.write_text(text)
    }

    /// Copy the whole content of a text box as-is. The clipboard is cleared
    /// first so an empty box reads as "" rather than the previous clipboard.
    pub fn copy_field(&mut self, at: CoordinatePoint) -> Result<String> {
        self.write_clipboard("")?;
        self.click(at, 1)?;
        self.chord(KeyChord::SelectAll)?;
        self.chord(KeyChord::Copy)?;
        // Click again to drop the selection.
        self.click(at, 1)?;
        self.read_clipboard()
    }

    /// Clear a text box and paste `text` into it.
    pub fn replace_field(&mut self, at: CoordinatePoint, text: &str) -> Result<()> {
        self.write_clipboard(text)?;
        self.click(at, 1)?;
        self.chord(KeyChord::SelectAll)?;
        self.chord(KeyChord::Delete)?;
        self.chord(KeyChord::Paste)
    }
}
