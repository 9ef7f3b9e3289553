mod host;
mod tray;

use tray::TrayManager;


use std::sync::Arc;

use elb_config::Config;
use elb_supervisor::{MenuModel, ServiceSupervisor, SupervisorConfig, logging};
use tauri::Manager;
use tracing::{error, info};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let app = tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|_app, _argv, _cwd| {
            // The tray is the whole UI; nothing to focus.
            info!("Second instance launch ignored");
        }))
        .setup(|app| {
            let config = Config::load(&app.path().app_config_dir()?)?;
            config.validate()?;

            let locator = host::locate(
                cfg!(debug_assertions),
                &std::env::current_dir()?,
                &app.path().resource_dir()?,
                config.runtime.resource_subdir(),
            );

            let log_dir = locator.log_dir(&config.logging);
            logging::init(&config.logging, &log_dir)?;

            info!("Starting Edge LLM Base v{}", env!("CARGO_PKG_VERSION"));
            info!(
                "Resource base: {} ({:?})",
                locator.base_dir().display(),
                locator.kind()
            );
            config.log_summary();

            let supervisor_config = Arc::new(SupervisorConfig::resolve(&config, &locator));
            let supervisor = ServiceSupervisor::new(supervisor_config);
            app.manage(supervisor.clone());

            // Setup signal handlers for graceful shutdown on Unix
            #[cfg(unix)]
            {
                let supervisor = supervisor.clone();
                std::thread::spawn(move || {
                    use signal_hook::consts::{SIGINT, SIGTERM};
                    use signal_hook::iterator::Signals;

                    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
                        Ok(s) => s,
                        Err(e) => {
                            error!("Failed to register signal handlers: {e}");
                            return;
                        }
                    };

                    if let Some(sig) = signals.forever().next() {
                        info!("Received signal {sig}, shutting down...");
                        tauri::async_runtime::block_on(supervisor.on_process_exit());
                        std::process::exit(0);
                    }
                });
            }

            let tray_manager = TrayManager::setup(app, log_dir)?;
            tray_manager.render(
                app.handle(),
                &MenuModel::from(&supervisor.current_state()),
            );
            app.manage(tray_manager.clone());

            // Keep the tray in step with every published state
            let app_handle = app.handle().clone();
            let mut state_rx = supervisor.subscribe();
            tauri::async_runtime::spawn(async move {
                while state_rx.changed().await.is_ok() {
                    let model = MenuModel::from(&*state_rx.borrow_and_update());
                    tray_manager.render(&app_handle, &model);
                }
            });

            if config.lifecycle.autostart {
                tauri::async_runtime::spawn(async move {
                    supervisor.start().await;
                });
            }

            Ok(())
        })
        .build(tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(e) => {
            error!("Error while building tauri application: {e}");
            eprintln!("Error while building tauri application: {e}");
            std::process::exit(1);
        }
    };

    app.run(|app_handle, event| {
        use tauri::RunEvent;

        if let RunEvent::ExitRequested { api, code, .. } = event {
            info!("Exit requested (code: {:?})", code);
            api.prevent_exit();

            if let Some(supervisor) = app_handle.try_state::<ServiceSupervisor>() {
                let supervisor = supervisor.inner().clone();
                tauri::async_runtime::block_on(supervisor.on_process_exit());
            }

            std::process::exit(code.unwrap_or(0));
        }
    });
}
