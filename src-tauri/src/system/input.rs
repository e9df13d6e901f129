use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use std::thread;
use std::time::Duration;

use crate::coordinates::CoordinatePoint;
use crate::error::{Error, Result};

/// Gap between the clicks of a double/triple click.
const MULTI_CLICK_GAP: Duration = Duration::from_millis(40);
/// Number of intermediate moves while dragging, so the target sees a real drag.
const DRAG_STEPS: i32 = 10;
const DRAG_STEP_DELAY: Duration = Duration::from_millis(15);

/// Fixed key chords used to drive both applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyChord {
    SelectAll,
    Copy,
    Paste,
    /// Backspace, used after select-all to clear a field.
    Delete,
    /// Poedit's "next entry" shortcut.
    NextField,
}

/// Synthetic pointer and keyboard actions at absolute screen positions.
pub trait InputDriver {
    /// Click `count` times (1 = click, 2 = double, 3 = triple).
    fn click(&mut self, at: CoordinatePoint, count: u32) -> Result<()>;
    /// Press at `from`, move to `to`, release.
    fn drag(&mut self, from: CoordinatePoint, to: CoordinatePoint) -> Result<()>;
    fn chord(&mut self, chord: KeyChord) -> Result<()>;
}

pub struct EnigoDriver {
    enigo: Enigo,
}

impl EnigoDriver {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| Error::Input(format!("Failed to create enigo: {}", e)))?;
        Ok(Self { enigo })
    }

    fn move_to(&mut self, at: CoordinatePoint) -> Result<()> {
        self.enigo
            .move_mouse(at.x, at.y, Coordinate::Abs)
            .map_err(|e| Error::Input(format!("Failed to move pointer to ({}, {}): {}", at.x, at.y, e)))
    }

    fn button(&mut self, direction: Direction) -> Result<()> {
        self.enigo
            .button(Button::Left, direction)
            .map_err(|e| Error::Input(format!("Failed to {:?} left button: {}", direction, e)))
    }

    fn key(&mut self, key: Key, direction: Direction) -> Result<()> {
        self.enigo
            .key(key, direction)
            .map_err(|e| Error::Input(format!("Failed to {:?} {:?}: {}", direction, key, e)))
    }
}

impl InputDriver for EnigoDriver {
    fn click(&mut self, at: CoordinatePoint, count: u32) -> Result<()> {
        self.move_to(at)?;
        for n in 0..count.max(1) {
            if n > 0 {
                thread::sleep(MULTI_CLICK_GAP);
            }
            self.button(Direction::Click)?;
        }
        Ok(())
    }

    fn drag(&mut self, from: CoordinatePoint, to: CoordinatePoint) -> Result<()> {
        self.move_to(from)?;
        self.button(Direction::Press)?;
        let result = (1..=DRAG_STEPS).try_for_each(|step| {
            thread::sleep(DRAG_STEP_DELAY);
            let x = from.x + (to.x - from.x) * step / DRAG_STEPS;
            let y = from.y + (to.y - from.y) * step / DRAG_STEPS;
            self.move_to(CoordinatePoint::new(x, y))
        });
        // Always release, even when a move failed, so the button is not left held.
        self.button(Direction::Release)?;
        result
    }

    fn chord(&mut self, chord: KeyChord) -> Result<()> {
        let (modifier, key) = chord_keys(chord);
        match modifier {
            Some(modifier) => {
                self.key(modifier, Direction::Press)?;
                let result = self.key(key, Direction::Click);
                self.key(modifier, Direction::Release)?;
                result
            }
            None => self.key(key, Direction::Click),
        }
    }
}

// Raw virtual key codes on Windows: Key::Unicode can fail with TryFromIntError
// on some keyboard layouts.
#[cfg(target_os = "windows")]
fn chord_keys(chord: KeyChord) -> (Option<Key>, Key) {
    // VK_CONTROL = 0x11
    let ctrl = Some(Key::Other(0x11));
    match chord {
        KeyChord::SelectAll => (ctrl, Key::Other(0x41)),
        KeyChord::Copy => (ctrl, Key::Other(0x43)),
        KeyChord::Paste => (ctrl, Key::Other(0x56)),
        KeyChord::Delete => (None, Key::Backspace),
        KeyChord::NextField => (ctrl, Key::DownArrow),
    }
}

#[cfg(target_os = "macos")]
fn chord_keys(chord: KeyChord) -> (Option<Key>, Key) {
    let cmd = Some(Key::Meta);
    match chord {
        KeyChord::SelectAll => (cmd, Key::Unicode('a')),
        KeyChord::Copy => (cmd, Key::Unicode('c')),
        KeyChord::Paste => (cmd, Key::Unicode('v')),
        KeyChord::Delete => (None, Key::Backspace),
        KeyChord::NextField => (cmd, Key::DownArrow),
    }
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn chord_keys(chord: KeyChord) -> (Option<Key>, Key) {
    let ctrl = Some(Key::Control);
    match chord {
        KeyChord::SelectAll => (ctrl, Key::Unicode('a')),
        KeyChord::Copy => (ctrl, Key::Unicode('c')),
        KeyChord::Paste => (ctrl, Key::Unicode('v')),
        KeyChord::Delete => (None, Key::Backspace),
        KeyChord::NextField => (ctrl, Key::DownArrow),
    }
}
