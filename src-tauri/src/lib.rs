pub mod automation;
pub mod commands;
pub mod config;
pub mod control;
pub mod coordinates;
pub mod error;
pub mod hotkeys;
pub mod settings;
pub mod state;
pub mod status;
pub mod system;

use std::sync::{Arc, Mutex};
use tauri::Manager;
use tokio::sync::mpsc;

use config::AppConfig;
use control::{ControlHandle, Controller, DesktopLauncher};
use hotkeys::{HotkeyBindings, HotkeyControlPlane};
use settings::Settings;
use status::TauriSink;
use system::clipboard::SnapshotStore;
use system::global_hook::{self, TauriHook};
use system::tray::TraySignals;

/// Bindings from settings, or the defaults when the stored strings are invalid.
fn initial_bindings(settings: &Settings) -> error::Result<HotkeyBindings> {
    match HotkeyBindings::parse(&settings.start_hotkey, &settings.stop_hotkey) {
        Ok(bindings) => Ok(bindings),
        Err(e) => {
            log::warn!("Invalid hotkey in settings: {}, using defaults", e);
            let defaults = Settings::default();
            HotkeyBindings::parse(&defaults.start_hotkey, &defaults.stop_hotkey)
        }
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::init();

    let app = tauri::Builder::default()
        .plugin(
            tauri_plugin_global_shortcut::Builder::new()
                .with_handler(|app, shortcut, event| {
                    let Some(key) = global_hook::key_event(shortcut, event.state) else {
                        log::debug!("Unmapped shortcut fired: {:?}", shortcut);
                        return;
                    };
                    if let Some(plane) = app.try_state::<Arc<HotkeyControlPlane>>() {
                        let outcome = plane.handle_key(&key);
                        log::debug!("Hotkey {:?} -> {:?}", key, outcome);
                    }
                })
                .build(),
        )
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_notification::init())
        .setup(|app| {
            let config = AppConfig::new()?;
            config.ensure_dirs()?;

            let user_settings = Settings::load(&config.data_dir);
            let bindings = initial_bindings(&user_settings)?;
            log::info!(
                "Loaded settings: copy method {}, start {}, stop {}",
                user_settings.copy_method,
                bindings.start,
                bindings.stop
            );

            let (signal_tx, signal_rx) = mpsc::unbounded_channel();
            let (progress_tx, progress_rx) = mpsc::unbounded_channel();

            let control = Arc::new(ControlHandle::new(
                Controller::new(
                    Arc::new(DesktopLauncher),
                    progress_tx,
                    Some(config.snapshot_path.clone()),
                ),
                Arc::new(TauriSink::new(app.handle().clone())),
            ));
            let settings = Arc::new(Mutex::new(user_settings));
            let plane = Arc::new(HotkeyControlPlane::new(
                Arc::new(TauriHook::new(app.handle().clone())),
                signal_tx.clone(),
                bindings,
            ));

            app.manage(control.clone());
            app.manage(settings.clone());
            app.manage(plane.clone());
            app.manage(TraySignals(signal_tx));
            app.manage(config);

            plane.listen();
            system::tray::setup_tray(app.handle())?;

            // Make close button hide the window instead of destroying it
            if let Some(window) = app.get_webview_window("main") {
                let w = window.clone();
                window.on_window_event(move |event| {
                    if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                        api.prevent_close();
                        let _ = w.hide();
                    }
                });
            }

            tauri::async_runtime::spawn(control::run_control_loop(
                control,
                settings,
                signal_rx,
                progress_rx,
            ));

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::start_translation,
            commands::stop_translation,
            commands::get_run_state,
            commands::get_status_log,
            commands::get_settings,
            commands::set_settings,
            commands::set_coordinate,
            commands::clear_coordinate,
            commands::begin_hotkey_rebind,
            commands::capture_rebind_key,
            commands::cancel_hotkey_rebind,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app, event| {
        if let tauri::RunEvent::Exit = event {
            shutdown(app);
        }
    });
}

/// Stop any run, drop the hotkey hook and the clipboard snapshot.
fn shutdown(app: &tauri::AppHandle) {
    if let Some(control) = app.try_state::<Arc<ControlHandle>>() {
        control.stop();
    }
    if let Some(plane) = app.try_state::<Arc<HotkeyControlPlane>>() {
        plane.shutdown();
    }
    if let Some(config) = app.try_state::<AppConfig>() {
        SnapshotStore::new(config.snapshot_path.clone()).cleanup();
    }
    log::info!("Shut down");
}
