use tauri::AppHandle;
use tauri_plugin_global_shortcut::{Code, GlobalShortcutExt, Modifiers, Shortcut, ShortcutState};

use crate::error::{Error, Result};
use crate::hotkeys::{HookHandle, HotkeyHook, HotkeySpec, KeyEvent, ModifierSet};

/// Key tokens as written in hotkey strings, and their physical key codes.
const KEY_CODES: &[(&str, Code)] = &[
    ("space", Code::Space),
    ("enter", Code::Enter),
    ("tab", Code::Tab),
    ("escape", Code::Escape),
    ("backspace", Code::Backspace),
    ("delete", Code::Delete),
    ("insert", Code::Insert),
    ("home", Code::Home),
    ("end", Code::End),
    ("pageup", Code::PageUp),
    ("pagedown", Code::PageDown),
    ("up", Code::ArrowUp),
    ("down", Code::ArrowDown),
    ("left", Code::ArrowLeft),
    ("right", Code::ArrowRight),
    ("pause", Code::Pause),
    ("f1", Code::F1),
    ("f2", Code::F2),
    ("f3", Code::F3),
    ("f4", Code::F4),
    ("f5", Code::F5),
    ("f6", Code::F6),
    ("f7", Code::F7),
    ("f8", Code::F8),
    ("f9", Code::F9),
    ("f10", Code::F10),
    ("f11", Code::F11),
    ("f12", Code::F12),
    ("`", Code::Backquote),
    ("-", Code::Minus),
    ("=", Code::Equal),
    ("[", Code::BracketLeft),
    ("]", Code::BracketRight),
    ("\\", Code::Backslash),
    (";", Code::Semicolon),
    ("'", Code::Quote),
    (",", Code::Comma),
    (".", Code::Period),
    ("/", Code::Slash),
    ("0", Code::Digit0),
    ("1", Code::Digit1),
    ("2", Code::Digit2),
    ("3", Code::Digit3),
    ("4", Code::Digit4),
    ("5", Code::Digit5),
    ("6", Code::Digit6),
    ("7", Code::Digit7),
    ("8", Code::Digit8),
    ("9", Code::Digit9),
    ("a", Code::KeyA),
    ("b", Code::KeyB),
    ("c", Code::KeyC),
    ("d", Code::KeyD),
    ("e", Code::KeyE),
    ("f", Code::KeyF),
    ("g", Code::KeyG),
    ("h", Code::KeyH),
    ("i", Code::KeyI),
    ("j", Code::KeyJ),
    ("k", Code::KeyK),
    ("l", Code::KeyL),
    ("m", Code::KeyM),
    ("n", Code::KeyN),
    ("o", Code::KeyO),
    ("p", Code::KeyP),
    ("q", Code::KeyQ),
    ("r", Code::KeyR),
    ("s", Code::KeyS),
    ("t", Code::KeyT),
    ("u", Code::KeyU),
    ("v", Code::KeyV),
    ("w", Code::KeyW),
    ("x", Code::KeyX),
    ("y", Code::KeyY),
    ("z", Code::KeyZ),
];

fn code_for(key: &str) -> Option<Code> {
    KEY_CODES
        .iter()
        .find(|(token, _)| *token == key)
        .map(|(_, code)| *code)
}

fn token_for(code: Code) -> Option<&'static str> {
    KEY_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(token, _)| *token)
}

fn to_shortcut(spec: &HotkeySpec) -> Result<Shortcut> {
    let key = spec.key.as_deref().ok_or_else(|| {
        Error::Hotkey(format!(
            "modifier-only hotkey '{}' cannot be registered globally",
            spec
        ))
    })?;
    let code = code_for(key).ok_or_else(|| Error::InvalidHotkey(format!("Unknown key: {}", key)))?;

    let mut modifiers = Modifiers::empty();
    if spec.modifiers.ctrl {
        modifiers |= Modifiers::CONTROL;
    }
    if spec.modifiers.alt {
        modifiers |= Modifiers::ALT;
    }
    if spec.modifiers.shift {
        modifiers |= Modifiers::SHIFT;
    }
    let mods = if modifiers.is_empty() {
        None
    } else {
        Some(modifiers)
    };
    Ok(Shortcut::new(mods, code))
}

/// Translate a fired global shortcut back into a key event for the control plane.
pub fn key_event(shortcut: &Shortcut, state: ShortcutState) -> Option<KeyEvent> {
    let key = token_for(shortcut.key)?;
    let modifiers = ModifierSet {
        ctrl: shortcut.mods.contains(Modifiers::CONTROL),
        alt: shortcut.mods.contains(Modifiers::ALT),
        shift: shortcut.mods.contains(Modifiers::SHIFT),
    };
    Some(match state {
        ShortcutState::Pressed => KeyEvent::down(key, modifiers),
        ShortcutState::Released => KeyEvent::up(key, modifiers),
    })
}

/// Hotkey hook backed by the global-shortcut plugin. Fired shortcuts arrive in
/// the plugin handler installed in `run()`.
pub struct TauriHook {
    app: AppHandle,
}

impl TauriHook {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl HotkeyHook for TauriHook {
    fn register(&self, specs: &[HotkeySpec]) -> Result<HookHandle> {
        let mut registered: Vec<HotkeySpec> = Vec::new();
        for spec in specs {
            if registered.contains(spec) {
                continue;
            }
            let shortcut = match to_shortcut(spec) {
                Ok(shortcut) => shortcut,
                Err(e) => {
                    log::error!("Skipping hotkey {}: {}", spec, e);
                    continue;
                }
            };
            if let Err(e) = self.app.global_shortcut().register(shortcut) {
                // Leave nothing half-registered.
                let _ = self.unregister(HookHandle::new(registered));
                return Err(Error::Hotkey(format!("Failed to register {}: {}", spec, e)));
            }
            registered.push(spec.clone());
        }
        Ok(HookHandle::new(registered))
    }

    fn unregister(&self, handle: HookHandle) -> Result<()> {
        let mut failure = None;
        for spec in handle.specs() {
            let result = to_shortcut(spec).and_then(|shortcut| {
                self.app
                    .global_shortcut()
                    .unregister(shortcut)
                    .map_err(|e| Error::Hotkey(format!("Failed to unregister {}: {}", spec, e)))
            });
            if let Err(e) = result {
                failure = Some(e);
            }
        }
        failure.map_or(Ok(()), Err)
    }
}
