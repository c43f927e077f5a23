/*
 * This module provides utility functions for locating the application's
 * configuration directory. A packaged install keeps its settings inside the
 * package's own storage folder; an unpackaged one uses the per-user local
 * configuration directory.
 *
 * Resolution runs before logging is set up (the log file lives in the same
 * directory), so failures are returned to the caller rather than logged here.
 */
use super::config::{ConfigError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Subfolder of a package storage folder that survives app updates.
pub const PACKAGE_SETTINGS_SUBFOLDER: &str = "RoamingState";

/*
 * Where settings and the log file live, without touching the disk.
 * `package_storage` is the package storage folder when the process runs
 * with package identity. `None` when no home directory can be determined.
 */
pub fn config_dir_candidate(package_storage: Option<&Path>, app_name: &str) -> Option<PathBuf> {
    match package_storage {
        Some(storage) => Some(storage.join(PACKAGE_SETTINGS_SUBFOLDER)),
        None => ProjectDirs::from("", "", app_name)
            .map(|proj_dirs| proj_dirs.config_local_dir().to_path_buf()),
    }
}

/// Resolves the configuration directory and creates it if necessary.
pub fn resolve_config_dir(package_storage: Option<&Path>, app_name: &str) -> Result<PathBuf> {
    let dir = config_dir_candidate(package_storage, app_name).ok_or(ConfigError::NoConfigDirectory)?;
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
