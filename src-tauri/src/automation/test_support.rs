//! In-memory stand-ins for the desktop, used by the automation tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::automation::desktop::Desktop;
use crate::coordinates::{CoordinatePoint, CoordinateRegistry};
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::state::RunFlag;
use crate::system::clipboard::ClipboardBridge;
use crate::system::input::{InputDriver, KeyChord};

const SOURCE: CoordinatePoint = CoordinatePoint { x: 10, y: 10 };
const TARGET: CoordinatePoint = CoordinatePoint { x: 10, y: 20 };
const SERVICE_INPUT: CoordinatePoint = CoordinatePoint { x: 500, y: 10 };
const SERVICE_OUTPUT: CoordinatePoint = CoordinatePoint { x: 500, y: 20 };
const COPY_BUTTON: CoordinatePoint = CoordinatePoint { x: 500, y: 30 };
const GESTURE: CoordinatePoint = CoordinatePoint { x: 500, y: 40 };

/// Every point configured.
pub fn test_layout() -> CoordinateRegistry {
    CoordinateRegistry {
        source_field: Some(SOURCE),
        target_field: Some(TARGET),
        service_input: Some(SERVICE_INPUT),
        service_copy_trigger: Some(COPY_BUTTON),
        service_output: Some(SERVICE_OUTPUT),
        gesture_anchor: Some(GESTURE),
    }
}

// ---------------------------------------------------------------------------
// Scripted desktop: clipboard reads come from a fixed script.
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ScriptRecord {
    samples: VecDeque<String>,
    pub clicks: usize,
    /// Click count of every click, in order.
    pub click_counts: Vec<u32>,
    pub chords: Vec<KeyChord>,
    pub writes: Vec<String>,
    pub drags: Vec<(CoordinatePoint, CoordinatePoint)>,
    pub flag: RunFlag,
}

struct ScriptedInput(Rc<RefCell<ScriptRecord>>);

impl InputDriver for ScriptedInput {
    fn click(&mut self, _at: CoordinatePoint, count: u32) -> Result<()> {
        let mut record = self.0.borrow_mut();
        record.clicks += 1;
        record.click_counts.push(count);
        Ok(())
    }

    fn drag(&mut self, from: CoordinatePoint, to: CoordinatePoint) -> Result<()> {
        self.0.borrow_mut().drags.push((from, to));
        Ok(())
    }

    fn chord(&mut self, chord: KeyChord) -> Result<()> {
        self.0.borrow_mut().chords.push(chord);
        Ok(())
    }
}

struct ScriptedClipboard(Rc<RefCell<ScriptRecord>>);

impl ClipboardBridge for ScriptedClipboard {
    fn read_text(&mut self) -> Result<String> {
        Ok(self.0.borrow_mut().samples.pop_front().unwrap_or_default())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.0.borrow_mut().writes.push(text.to_string());
        Ok(())
    }
}

/// A desktop whose clipboard returns `samples` in order, then "".
pub fn scripted_desktop(samples: &[&str]) -> (Desktop, Rc<RefCell<ScriptRecord>>) {
    let flag = RunFlag::new();
    flag.raise();
    let record = Rc::new(RefCell::new(ScriptRecord {
        samples: samples.iter().map(|s| s.to_string()).collect(),
        flag: flag.clone(),
        ..Default::default()
    }));
    let desktop = Desktop::new(
        Box::new(ScriptedInput(record.clone())),
        Box::new(ScriptedClipboard(record.clone())),
        flag,
        Duration::ZERO,
    );
    (desktop, record)
}

// ---------------------------------------------------------------------------
// Fake world: a Poedit catalog next to a translation service.
// ---------------------------------------------------------------------------

/// What the service output shows while a translation is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagShows {
    /// The previous translation.
    Previous,
    Blank,
    /// The text that was just sent.
    Echo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Source,
    Target,
    ServiceInput,
    ServiceOutput,
}

struct World {
    sources: Vec<String>,
    targets: Vec<String>,
    cursor: usize,
    focus: Option<Focus>,
    selected: bool,
    clipboard: String,
    service_input: String,
    previous_output: String,
    lag: u32,
    lag_shows: LagShows,
    pending: u32,
    dispatched: Vec<String>,
    failing_copies: u32,
    stop_after: Option<usize>,
    flag: RunFlag,
}

fn translate(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("[fr] {}", text)
    }
}

impl World {
    /// What the service output shows right now. Each look counts as one tick
    /// of service latency.
    fn output(&mut self) -> String {
        if self.pending > 0 {
            self.pending -= 1;
            match self.lag_shows {
                LagShows::Previous => self.previous_output.clone(),
                LagShows::Blank => String::new(),
                LagShows::Echo => self.service_input.clone(),
            }
        } else {
            translate(&self.service_input)
        }
    }

    fn focus_at(at: CoordinatePoint) -> Option<Focus> {
        match at {
            p if p == SOURCE => Some(Focus::Source),
            p if p == TARGET => Some(Focus::Target),
            p if p == SERVICE_INPUT => Some(Focus::ServiceInput),
            p if p == SERVICE_OUTPUT => Some(Focus::ServiceOutput),
            _ => None,
        }
    }

    fn focused_text(&mut self) -> String {
        match self.focus {
            Some(Focus::Source) => self.sources[self.cursor].clone(),
            Some(Focus::Target) => self.targets[self.cursor].clone(),
            Some(Focus::ServiceInput) => self.service_input.clone(),
            Some(Focus::ServiceOutput) => self.output(),
            None => String::new(),
        }
    }

    fn dispatch(&mut self, text: String) {
        self.previous_output = self
            .dispatched
            .last()
            .map(|last| translate(last))
            .unwrap_or_default();
        self.service_input = text.clone();
        self.dispatched.push(text);
        self.pending = self.lag;
        if self.stop_after == Some(self.dispatched.len()) {
            self.flag.lower();
        }
    }
}

struct WorldInput(Rc<RefCell<World>>);

impl InputDriver for WorldInput {
    fn click(&mut self, at: CoordinatePoint, count: u32) -> Result<()> {
        let mut world = self.0.borrow_mut();
        if at == COPY_BUTTON {
            let shown = world.output();
            world.clipboard = shown;
            return Ok(());
        }
        world.focus = World::focus_at(at);
        world.selected = count >= 2;
        Ok(())
    }

    fn drag(&mut self, _from: CoordinatePoint, _to: CoordinatePoint) -> Result<()> {
        Ok(())
    }

    fn chord(&mut self, chord: KeyChord) -> Result<()> {
        let mut world = self.0.borrow_mut();
        match chord {
            KeyChord::SelectAll => world.selected = true,
            KeyChord::Copy => {
                if world.failing_copies > 0 {
                    world.failing_copies -= 1;
                    return Err(Error::Input("copy shortcut was not delivered".into()));
                }
                if world.selected {
                    let text = world.focused_text();
                    // Copying an empty selection leaves the clipboard alone.
                    if !text.is_empty() {
                        world.clipboard = text;
                    }
                }
            }
            KeyChord::Delete => {
                if world.selected {
                    let cursor = world.cursor;
                    match world.focus {
                        Some(Focus::Target) => world.targets[cursor].clear(),
                        Some(Focus::ServiceInput) => world.service_input.clear(),
                        _ => {}
                    }
                }
                world.selected = false;
            }
            KeyChord::Paste => {
                let text = world.clipboard.clone();
                let cursor = world.cursor;
                match world.focus {
                    Some(Focus::Target) => world.targets[cursor] = text,
                    Some(Focus::ServiceInput) => world.dispatch(text),
                    _ => {}
                }
                world.selected = false;
            }
            KeyChord::NextField => {
                world.cursor = (world.cursor + 1).min(world.sources.len() - 1);
            }
        }
        Ok(())
    }
}

struct WorldClipboard(Rc<RefCell<World>>);

impl ClipboardBridge for WorldClipboard {
    fn read_text(&mut self) -> Result<String> {
        Ok(self.0.borrow().clipboard.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.0.borrow_mut().clipboard = text.to_string();
        Ok(())
    }
}

/// A catalog of entries, the cursor on the first one, and a service that
/// answers with `"[fr] " + text`.
pub struct FakeWorld(Rc<RefCell<World>>);

impl FakeWorld {
    pub fn with_sources(sources: &[&str]) -> Self {
        assert!(!sources.is_empty());
        let flag = RunFlag::new();
        flag.raise();
        Self(Rc::new(RefCell::new(World {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            targets: vec![String::new(); sources.len()],
            cursor: 0,
            focus: None,
            selected: false,
            clipboard: String::new(),
            service_input: String::new(),
            previous_output: String::new(),
            lag: 0,
            lag_shows: LagShows::Previous,
            pending: 0,
            dispatched: Vec::new(),
            failing_copies: 0,
            stop_after: None,
            flag,
        })))
    }

    /// Full layout, no delays, snapshots off.
    pub fn settings(&self) -> Settings {
        Settings {
            coordinates: test_layout(),
            translation_wait_ms: 0,
            poll_interval_ms: 0,
            gesture_wait_ms: 0,
            action_delay_ms: 0,
            clipboard_snapshots: false,
            ..Settings::default()
        }
    }

    pub fn desktop(&self) -> Desktop {
        let flag = self.0.borrow().flag.clone();
        Desktop::new(
            Box::new(WorldInput(self.0.clone())),
            Box::new(WorldClipboard(self.0.clone())),
            flag,
            Duration::ZERO,
        )
    }

    pub fn dispatched(&self) -> Vec<String> {
        self.0.borrow().dispatched.clone()
    }

    pub fn target(&self, index: usize) -> String {
        self.0.borrow().targets[index].clone()
    }

    pub fn set_target(&self, index: usize, text: &str) {
        self.0.borrow_mut().targets[index] = text.to_string();
    }

    /// The service needs `looks` samples after each dispatch before its
    /// output is ready.
    pub fn set_service_lag(&self, looks: u32, shows: LagShows) {
        let mut world = self.0.borrow_mut();
        world.lag = looks;
        world.lag_shows = shows;
    }

    pub fn fail_next_copies(&self, count: u32) {
        self.0.borrow_mut().failing_copies = count;
    }

    /// Lower the run flag right after the `count`th text reaches the service.
    pub fn stop_after_dispatches(&self, count: usize) {
        self.0.borrow_mut().stop_after = Some(count);
    }
}
