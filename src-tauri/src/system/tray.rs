use tauri::{
    image::Image,
    menu::{Menu, MenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::state::{ControlSignal, RunState};

const TRAY_ID: &str = "main";

/// Sender the tray menu uses; same channel as the hotkeys.
pub struct TraySignals(pub UnboundedSender<ControlSignal>);

pub fn setup_tray(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let start_item =
        MenuItem::with_id(app, "start_translation", "Start Translation", true, None::<&str>)?;
    let stop_item =
        MenuItem::with_id(app, "stop_translation", "Stop Translation", true, None::<&str>)?;
    let show_item = MenuItem::with_id(app, "show_window", "Show Window", true, None::<&str>)?;
    let quit_item = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;

    let menu = Menu::with_items(app, &[&start_item, &stop_item, &show_item, &quit_item])?;

    let icon = app.default_window_icon().cloned().unwrap_or_else(|| {
        // Solid blue square when the bundle has no icon.
        let mut rgba = Vec::with_capacity(32 * 32 * 4);
        for _ in 0..(32 * 32) {
            rgba.extend_from_slice(&[37, 99, 235, 255]);
        }
        Image::new_owned(rgba, 32, 32)
    });

    let _tray = TrayIconBuilder::with_id(TRAY_ID)
        .icon(icon)
        .menu(&menu)
        .show_menu_on_left_click(false)
        .tooltip(tooltip(RunState::Idle))
        .on_menu_event(|app, event| match event.id.as_ref() {
            "start_translation" => send(app, ControlSignal::Start),
            "stop_translation" => send(app, ControlSignal::Stop),
            "show_window" => show_main_window(app),
            "quit" => app.exit(0),
            _ => {}
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                show_main_window(tray.app_handle());
            }
        })
        .build(app)?;

    Ok(())
}

fn send(app: &AppHandle, signal: ControlSignal) {
    if let Some(signals) = app.try_state::<TraySignals>() {
        if signals.0.send(signal).is_err() {
            log::warn!("Control loop is gone, tray {:?} dropped", signal);
        }
    }
}

fn show_main_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window("main") {
        let _ = window.show();
        let _ = window.set_focus();
    }
}

fn tooltip(state: RunState) -> &'static str {
    match state {
        RunState::Idle => "Poedit Auto-Translate - Idle",
        RunState::Running => "Poedit Auto-Translate - Translating",
        RunState::StoppingRequested => "Poedit Auto-Translate - Stopping",
    }
}

/// Queues the tooltip update on the main thread without waiting for it.
pub fn show_run_state(app: &AppHandle, state: RunState) {
    let handle = app.clone();
    let queued = app.run_on_main_thread(move || {
        if let Some(tray) = handle.tray_by_id(TRAY_ID) {
            let _ = tray.set_tooltip(Some(tooltip(state)));
        }
    });
    if let Err(e) = queued {
        log::debug!("Failed to queue tray tooltip: {}", e);
    }
}
