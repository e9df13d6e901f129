//! Global start/stop hotkeys.
//!
//! The control plane is either `Listening` (one OS hook registered for both
//! bindings) or `Rebinding` (hook removed, next non-modifier key becomes the new
//! binding for one role). Matches are forwarded as [`ControlSignal`]s; the hook
//! callback never touches run state itself.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{Error, Result};
use crate::state::ControlSignal;

const MODIFIER_KEY_NAMES: &[&str] = &[
    "ctrl",
    "control",
    "left ctrl",
    "right ctrl",
    "alt",
    "left alt",
    "right alt",
    "altgraph",
    "alt gr",
    "option",
    "shift",
    "left shift",
    "right shift",
    "meta",
    "super",
    "cmd",
    "command",
    "win",
    "windows",
];

/// True for keys that only act as modifiers and can never be a main key.
pub fn is_modifier_key(name: &str) -> bool {
    MODIFIER_KEY_NAMES.contains(&name.trim().to_lowercase().as_str())
}

fn normalize_key(key: &str) -> String {
    match key.trim().to_lowercase().as_str() {
        "esc" => "escape".to_string(),
        "return" => "enter".to_string(),
        "del" => "delete".to_string(),
        " " | "spacebar" => "space".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierSet {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl ModifierSet {
    pub const NONE: ModifierSet = ModifierSet {
        ctrl: false,
        alt: false,
        shift: false,
    };
}

/// Modifier set plus an optional main key, written as e.g. `ctrl+shift+s`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HotkeySpec {
    pub modifiers: ModifierSet,
    pub key: Option<String>,
}

impl HotkeySpec {
    pub fn parse(input: &str) -> Result<Self> {
        let combo = input.trim().to_lowercase();
        let parts: Vec<&str> = combo
            .split('+')
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            return Err(Error::InvalidHotkey("empty hotkey".to_string()));
        }

        let mut modifiers = ModifierSet::NONE;
        let mut key = None;
        for part in parts {
            match part {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                other => {
                    if key.is_some() {
                        return Err(Error::InvalidHotkey(format!(
                            "multiple keys in hotkey: {}",
                            input
                        )));
                    }
                    key = Some(normalize_key(other));
                }
            }
        }
        Ok(Self { modifiers, key })
    }

    /// Key-down with exactly these modifiers and, if set, this main key.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if !event.pressed || event.modifiers != self.modifiers {
            return false;
        }
        match &self.key {
            Some(key) => *key == normalize_key(&event.key),
            None => true,
        }
    }
}

impl fmt::Display for HotkeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        if self.modifiers.ctrl {
            parts.push("ctrl");
        }
        if self.modifiers.alt {
            parts.push("alt");
        }
        if self.modifiers.shift {
            parts.push("shift");
        }
        if let Some(key) = &self.key {
            parts.push(key);
        }
        write!(f, "{}", parts.join("+"))
    }
}

impl std::str::FromStr for HotkeySpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A key transition as seen by a hook: key token, modifiers held, down or up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub modifiers: ModifierSet,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn down(key: &str, modifiers: ModifierSet) -> Self {
        Self {
            key: normalize_key(key),
            modifiers,
            pressed: true,
        }
    }

    pub fn up(key: &str, modifiers: ModifierSet) -> Self {
        Self {
            key: normalize_key(key),
            modifiers,
            pressed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotkeyRole {
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBindings {
    pub start: HotkeySpec,
    pub stop: HotkeySpec,
}

impl HotkeyBindings {
    pub fn parse(start: &str, stop: &str) -> Result<Self> {
        Ok(Self {
            start: HotkeySpec::parse(start)?,
            stop: HotkeySpec::parse(stop)?,
        })
    }

    pub fn get(&self, role: HotkeyRole) -> &HotkeySpec {
        match role {
            HotkeyRole::Start => &self.start,
            HotkeyRole::Stop => &self.stop,
        }
    }

    fn set(&mut self, role: HotkeyRole, spec: HotkeySpec) {
        match role {
            HotkeyRole::Start => self.start = spec,
            HotkeyRole::Stop => self.stop = spec,
        }
    }

    fn specs(&self) -> Vec<HotkeySpec> {
        vec![self.start.clone(), self.stop.clone()]
    }
}

/// Proof that a hook is registered; hand it back to remove the hook.
#[derive(Debug)]
pub struct HookHandle {
    specs: Vec<HotkeySpec>,
}

impl HookHandle {
    pub fn new(specs: Vec<HotkeySpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[HotkeySpec] {
        &self.specs
    }
}

/// OS-level key hook. Implementations deliver events to
/// [`HotkeyControlPlane::handle_key`] from their own thread.
pub trait HotkeyHook: Send + Sync {
    fn register(&self, specs: &[HotkeySpec]) -> Result<HookHandle>;
    fn unregister(&self, handle: HookHandle) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "role", rename_all = "lowercase")]
pub enum PlaneMode {
    Listening,
    Rebinding(HotkeyRole),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Signal(ControlSignal),
    Rebound(HotkeyRole, HotkeySpec),
}

struct PlaneInner {
    mode: PlaneMode,
    bindings: HotkeyBindings,
    hook: Option<HookHandle>,
    held: HashSet<String>,
}

pub struct HotkeyControlPlane {
    backend: Arc<dyn HotkeyHook>,
    signals: UnboundedSender<ControlSignal>,
    inner: Mutex<PlaneInner>,
}

impl HotkeyControlPlane {
    pub fn new(
        backend: Arc<dyn HotkeyHook>,
        signals: UnboundedSender<ControlSignal>,
        bindings: HotkeyBindings,
    ) -> Self {
        Self {
            backend,
            signals,
            inner: Mutex::new(PlaneInner {
                mode: PlaneMode::Listening,
                bindings,
                hook: None,
                held: HashSet::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlaneInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install the listening hook if none is active.
    pub fn listen(&self) {
        let mut inner = self.lock();
        // A release that arrived while not listening was never seen.
        inner.held.clear();
        inner.mode = PlaneMode::Listening;
        self.install(&mut inner);
    }

    pub fn mode(&self) -> PlaneMode {
        self.lock().mode
    }

    pub fn bindings(&self) -> HotkeyBindings {
        self.lock().bindings.clone()
    }

    pub fn is_hook_installed(&self) -> bool {
        self.lock().hook.is_some()
    }

    /// Replace both bindings; a listening hook is re-registered with them.
    pub fn set_bindings(&self, bindings: HotkeyBindings) {
        let mut inner = self.lock();
        inner.held.clear();
        if inner.bindings == bindings {
            return;
        }
        inner.bindings = bindings;
        if inner.mode == PlaneMode::Listening {
            self.uninstall(&mut inner);
            self.install(&mut inner);
        }
    }

    /// Remove the hook and wait for the next key as the new binding for `role`.
    /// Returns false if a rebind is already in progress.
    pub fn begin_rebind(&self, role: HotkeyRole) -> bool {
        let mut inner = self.lock();
        if matches!(inner.mode, PlaneMode::Rebinding(_)) {
            return false;
        }
        self.uninstall(&mut inner);
        inner.held.clear();
        inner.mode = PlaneMode::Rebinding(role);
        log::info!("Waiting for new {:?} hotkey", role);
        true
    }

    pub fn cancel_rebind(&self) {
        let mut inner = self.lock();
        if inner.mode == PlaneMode::Listening {
            return;
        }
        inner.mode = PlaneMode::Listening;
        self.install(&mut inner);
    }

    pub fn handle_key(&self, event: &KeyEvent) -> KeyOutcome {
        let mut inner = self.lock();
        match inner.mode {
            PlaneMode::Listening => {
                if !event.pressed {
                    inner.held.remove(&event.key);
                    return KeyOutcome::Ignored;
                }
                // OS auto-repeat: only the first down of a held key counts.
                if !inner.held.insert(event.key.clone()) {
                    return KeyOutcome::Ignored;
                }
                let signal = if inner.bindings.stop.matches(event) {
                    ControlSignal::Stop
                } else if inner.bindings.start.matches(event) {
                    ControlSignal::Start
                } else {
                    return KeyOutcome::Ignored;
                };
                drop(inner);
                if self.signals.send(signal).is_err() {
                    log::debug!("Control channel closed, dropping {:?}", signal);
                }
                KeyOutcome::Signal(signal)
            }
            PlaneMode::Rebinding(role) => {
                if !event.pressed || event.key.is_empty() || is_modifier_key(&event.key) {
                    return KeyOutcome::Ignored;
                }
                let spec = HotkeySpec {
                    modifiers: event.modifiers,
                    key: Some(normalize_key(&event.key)),
                };
                log::info!("{:?} hotkey bound to {}", role, spec);
                inner.bindings.set(role, spec.clone());
                inner.mode = PlaneMode::Listening;
                self.install(&mut inner);
                KeyOutcome::Rebound(role, spec)
            }
        }
    }

    /// Remove the hook at shutdown. Errors are logged and dropped.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        self.uninstall(&mut inner);
    }

    fn install(&self, inner: &mut PlaneInner) {
        if inner.hook.is_some() {
            return;
        }
        match self.backend.register(&inner.bindings.specs()) {
            Ok(handle) => {
                log::info!(
                    "Hotkeys registered: start={} stop={}",
                    inner.bindings.start,
                    inner.bindings.stop
                );
                inner.hook = Some(handle);
            }
            Err(e) => log::error!("Failed to register hotkeys: {}", e),
        }
    }

    fn uninstall(&self, inner: &mut PlaneInner) {
        if let Some(handle) = inner.hook.take() {
            if let Err(e) = self.backend.unregister(handle) {
                log::warn!("Failed to unregister hotkeys: {}", e);
            }
        }
    }
}
