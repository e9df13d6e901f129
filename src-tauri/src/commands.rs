use std::sync::{Arc, Mutex};
use tauri::State;

use crate::config::AppConfig;
use crate::control::ControlHandle;
use crate::coordinates::{CoordinatePoint, CoordinateRole};
use crate::hotkeys::{
    HotkeyBindings, HotkeyControlPlane, HotkeyRole, KeyEvent, KeyOutcome, ModifierSet,
    PlaneMode,
};
use crate::settings::Settings;
use crate::state::RunState;
use crate::status::StatusLine;

type SharedControl = Arc<ControlHandle>;
type SharedSettings = Arc<Mutex<Settings>>;

#[tauri::command]
pub async fn start_translation(
    control: State<'_, SharedControl>,
    settings: State<'_, SharedSettings>,
) -> Result<bool, String> {
    let settings = settings.lock().map_err(|e| e.to_string())?.clone();
    control.start(&settings).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn stop_translation(control: State<'_, SharedControl>) -> Result<bool, String> {
    Ok(control.stop())
}

#[tauri::command]
pub async fn get_run_state(control: State<'_, SharedControl>) -> Result<RunState, String> {
    Ok(control.state())
}

#[tauri::command]
pub async fn get_status_log(
    control: State<'_, SharedControl>,
) -> Result<Vec<StatusLine>, String> {
    Ok(control.status_lines())
}

#[tauri::command]
pub fn get_settings(settings: State<'_, SharedSettings>) -> Result<Settings, String> {
    let s = settings.lock().map_err(|e| e.to_string())?;
    Ok(s.clone())
}

/// Settings are read-only while a run is active.
fn ensure_idle(control: &SharedControl) -> Result<(), String> {
    if control.is_running() {
        Err("Settings cannot be changed while translation is running".to_string())
    } else {
        Ok(())
    }
}

#[tauri::command]
pub fn set_settings(
    new_settings: Settings,
    control: State<'_, SharedControl>,
    settings: State<'_, SharedSettings>,
    plane: State<'_, Arc<HotkeyControlPlane>>,
    config: State<'_, AppConfig>,
) -> Result<(), String> {
    ensure_idle(&control)?;
    let bindings = HotkeyBindings::parse(&new_settings.start_hotkey, &new_settings.stop_hotkey)
        .map_err(|e| e.to_string())?;

    {
        let mut s = settings.lock().map_err(|e| e.to_string())?;
        new_settings.save(&config.data_dir).map_err(|e| e.to_string())?;
        *s = new_settings;
    }
    plane.set_bindings(bindings);
    log::info!("Settings saved");
    Ok(())
}

fn update_coordinate(
    role: CoordinateRole,
    point: Option<CoordinatePoint>,
    control: &SharedControl,
    settings: &SharedSettings,
    config: &AppConfig,
) -> Result<(), String> {
    ensure_idle(control)?;
    let mut s = settings.lock().map_err(|e| e.to_string())?;
    s.coordinates.set(role, point);
    s.save(&config.data_dir).map_err(|e| e.to_string())?;
    match point {
        Some(p) => log::info!("{} set to ({}, {})", role.label(), p.x, p.y),
        None => log::info!("{} cleared", role.label()),
    }
    Ok(())
}

#[tauri::command]
pub fn set_coordinate(
    role: CoordinateRole,
    x: i32,
    y: i32,
    control: State<'_, SharedControl>,
    settings: State<'_, SharedSettings>,
    config: State<'_, AppConfig>,
) -> Result<(), String> {
    update_coordinate(
        role,
        Some(CoordinatePoint::new(x, y)),
        &control,
        &settings,
        &config,
    )
}

#[tauri::command]
pub fn clear_coordinate(
    role: CoordinateRole,
    control: State<'_, SharedControl>,
    settings: State<'_, SharedSettings>,
    config: State<'_, AppConfig>,
) -> Result<(), String> {
    update_coordinate(role, None, &control, &settings, &config)
}

#[tauri::command]
pub fn begin_hotkey_rebind(
    role: HotkeyRole,
    plane: State<'_, Arc<HotkeyControlPlane>>,
) -> Result<bool, String> {
    Ok(plane.begin_rebind(role))
}

/// Key pressed in the settings window while a rebind is pending. Returns the
/// new binding once one is captured.
#[tauri::command]
pub fn capture_rebind_key(
    key: String,
    ctrl: bool,
    alt: bool,
    shift: bool,
    plane: State<'_, Arc<HotkeyControlPlane>>,
    settings: State<'_, SharedSettings>,
    config: State<'_, AppConfig>,
) -> Result<Option<String>, String> {
    // Outside a rebind these keys belong to the webview, not the hotkeys.
    if plane.mode() == PlaneMode::Listening {
        return Ok(None);
    }
    let event = KeyEvent::down(&key, ModifierSet { ctrl, alt, shift });
    match plane.handle_key(&event) {
        KeyOutcome::Rebound(role, spec) => {
            let hotkey = spec.to_string();
            let mut s = settings.lock().map_err(|e| e.to_string())?;
            match role {
                HotkeyRole::Start => s.start_hotkey = hotkey.clone(),
                HotkeyRole::Stop => s.stop_hotkey = hotkey.clone(),
            }
            s.save(&config.data_dir).map_err(|e| e.to_string())?;
            Ok(Some(hotkey))
        }
        _ => Ok(None),
    }
}

#[tauri::command]
pub fn cancel_hotkey_rebind(plane: State<'_, Arc<HotkeyControlPlane>>) -> Result<(), String> {
    plane.cancel_rebind();
    Ok(())
}
