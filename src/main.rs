#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]
// The platform layer only exists on Windows; elsewhere only the tests use most of the crate.
#![cfg_attr(not(windows), allow(dead_code))]

mod app_logic;
mod core;
mod platform_layer;

use crate::app_logic::{TrayAppLogic, ui_constants};
use crate::core::{ConfigManagerOperations, CoreConfigManager, path_utils};
use crate::platform_layer::{PlatformEventHandler, PlatformResult};

use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/*
 * Sets up logging to the terminal and, when the configuration directory is
 * known, to a log file next to the settings. Every logger accepts everything;
 * the verbosity from the settings is applied through `log::set_max_level`.
 */
fn initialize_logging(log_file_path: Option<&Path>) -> Option<PathBuf> {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Debug)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Trace,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    let mut opened_log_file = None;
    let mut log_file_error = None;
    if let Some(path) = log_file_path {
        match File::create(path) {
            Ok(file) => {
                loggers.push(WriteLogger::new(LevelFilter::Trace, config, file));
                opened_log_file = Some(path.to_path_buf());
            }
            Err(e) => log_file_error = Some((path, e)),
        }
    }

    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("Failed to initialize logging: {e}");
    }
    // Until the settings are loaded.
    log::set_max_level(LevelFilter::Info);
    if let Some((path, e)) = log_file_error {
        log::error!("Failed to create log file {path:?}: {e}");
    }
    opened_log_file
}

#[cfg(windows)]
fn package_storage_folder() -> PlatformResult<Option<PathBuf>> {
    platform_layer::package::app_storage_folder()
}

#[cfg(not(windows))]
fn package_storage_folder() -> PlatformResult<Option<PathBuf>> {
    Ok(None)
}

fn main() -> PlatformResult<()> {
    // The log file lives in the configuration directory, so both are
    // resolved first and their outcome is only logged once logging runs.
    let package_storage = package_storage_folder();
    let config_dir = path_utils::resolve_config_dir(
        package_storage.as_ref().ok().and_then(|folder| folder.as_deref()),
        ui_constants::APP_NAME,
    );
    let log_file_path = initialize_logging(
        config_dir
            .as_ref()
            .ok()
            .map(|dir| dir.join(ui_constants::LOG_FILE_NAME))
            .as_deref(),
    );

    if let Err(e) = &package_storage {
        log::error!("Failed to resolve the package storage folder: {e}");
    }
    let config_dir = match config_dir {
        Ok(dir) => {
            log::info!("Application starting up. Configuration directory: {dir:?}");
            Some(dir)
        }
        Err(e) => {
            log::error!("Application starting up without a configuration directory: {e}");
            None
        }
    };

    let config_manager = Arc::new(CoreConfigManager::new(config_dir));
    let config_file = config_manager.config_file_path().ok();
    let app_logic = TrayAppLogic::new(config_manager, log_file_path);
    let event_handler: Arc<Mutex<dyn PlatformEventHandler>> = Arc::new(Mutex::new(app_logic));

    run(event_handler, config_file)
}

#[cfg(windows)]
fn run(
    event_handler: Arc<Mutex<dyn PlatformEventHandler>>,
    config_file: Option<PathBuf>,
) -> PlatformResult<()> {
    let platform = platform_layer::PlatformInterface::new(
        ui_constants::APP_NAME.to_string(),
        config_file,
    )?;
    let result = platform.run(event_handler);
    match &result {
        Ok(()) => log::info!("Application exited normally."),
        Err(e) => log::error!("Application exited with error: {e}"),
    }
    result
}

#[cfg(not(windows))]
fn run(
    _event_handler: Arc<Mutex<dyn PlatformEventHandler>>,
    _config_file: Option<PathBuf>,
) -> PlatformResult<()> {
    let error = platform_layer::PlatformError::UnsupportedPlatform;
    log::error!("{error}");
    Err(error)
}
