//! System tray: status line, start/stop controls, logs and exit.

use elb_supervisor::{MenuModel, ServiceSupervisor};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tauri::{
    AppHandle, Manager, Wry,
    menu::{Menu, MenuItem, PredefinedMenuItem},
    tray::TrayIconBuilder,
};
use tracing::{debug, info, warn};

pub(crate) const TRAY_ID: &str = "main";

const MENU_START: &str = "start";
const MENU_STOP: &str = "stop";
const MENU_LOGS: &str = "logs";
const MENU_EXIT: &str = "exit";

/// Handles to the menu items that change with server state.
pub struct TrayManager {
    status_item: MenuItem<Wry>,
    start_item: MenuItem<Wry>,
    stop_item: MenuItem<Wry>,
}

impl TrayManager {
    /// Create the tray icon and its menu.
    ///
    /// Menu callbacks only forward to the supervisor; rendering happens in
    /// [`TrayManager::render`] when the supervisor publishes a new state.
    pub fn setup(app: &tauri::App, log_dir: PathBuf) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let status_item =
            MenuItem::with_id(app, "status", "Status: Stopped", false, None::<&str>)?;
        let separator1 = PredefinedMenuItem::separator(app)?;
        let start_item = MenuItem::with_id(app, MENU_START, "Start Server", true, None::<&str>)?;
        let stop_item = MenuItem::with_id(app, MENU_STOP, "Stop Server", false, None::<&str>)?;
        let separator2 = PredefinedMenuItem::separator(app)?;
        let logs_item = MenuItem::with_id(app, MENU_LOGS, "Open Logs...", true, None::<&str>)?;
        let exit_item = MenuItem::with_id(app, MENU_EXIT, "Exit", true, None::<&str>)?;

        let menu = Menu::with_items(
            app,
            &[
                &status_item,
                &separator1,
                &start_item,
                &stop_item,
                &separator2,
                &logs_item,
                &exit_item,
            ],
        )?;

        let mut builder = TrayIconBuilder::with_id(TRAY_ID)
            .menu(&menu)
            .tooltip("Edge LLM Base")
            .show_menu_on_left_click(true)
            .on_menu_event(move |app, event| match event.id.as_ref() {
                MENU_START => {
                    if let Some(supervisor) = app.try_state::<ServiceSupervisor>() {
                        let supervisor = supervisor.inner().clone();
                        tauri::async_runtime::spawn(async move {
                            supervisor.start().await;
                        });
                    }
                }
                MENU_STOP => {
                    if let Some(supervisor) = app.try_state::<ServiceSupervisor>() {
                        let supervisor = supervisor.inner().clone();
                        tauri::async_runtime::spawn(async move {
                            supervisor.stop().await;
                        });
                    }
                }
                MENU_LOGS => open_directory(&log_dir),
                MENU_EXIT => {
                    let app_handle = app.clone();
                    tauri::async_runtime::spawn(async move {
                        if let Some(supervisor) = app_handle.try_state::<ServiceSupervisor>() {
                            supervisor.on_process_exit().await;
                        }
                        app_handle.exit(0);
                    });
                }
                _ => {}
            });

        if let Some(icon) = app.default_window_icon() {
            builder = builder.icon(icon.clone());
        }
        builder.build(app.app_handle())?;

        Ok(Arc::new(Self {
            status_item,
            start_item,
            stop_item,
        }))
    }

    /// Bring labels, tooltip and enabled flags in line with `model`.
    pub fn render(&self, app: &AppHandle, model: &MenuModel) {
        if let Err(e) = self.status_item.set_text(&model.status_label) {
            warn!("Failed to update tray status: {e}");
        }
        if let Err(e) = self.start_item.set_enabled(model.start_enabled) {
            warn!("Failed to update Start item: {e}");
        }
        if let Err(e) = self.stop_item.set_enabled(model.stop_enabled) {
            warn!("Failed to update Stop item: {e}");
        }

        if let Some(tray) = app.tray_by_id(TRAY_ID) {
            let _ = tray.set_tooltip(Some(&model.tooltip));
        }

        debug!("Tray status updated: {}", model.status_label);
    }
}

/// Open a directory in the system file manager.
fn open_directory(path: &Path) {
    if let Err(e) = std::fs::create_dir_all(path) {
        warn!("Cannot create {}: {e}", path.display());
        return;
    }
    info!("Opening {}", path.display());

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn().ok();
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("explorer").arg(path).spawn().ok();
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn().ok();
    }
}
