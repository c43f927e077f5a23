/*
 * Manages the persisted `Settings`. This module defines how settings are
 * stored in and retrieved from `settings.json` inside the application's
 * configuration directory.
 *
 * It uses a trait-based approach (`ConfigManagerOperations`) to allow for
 * mock implementations when testing the application logic. Loading is
 * forgiving: keys missing from the file keep their defaults (at any depth),
 * and unknown keys are collected for the caller to report instead of failing
 * the load. A value of the wrong type for a known key is still an error.
 */
use super::settings::Settings;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILENAME: &str = "settings.json";
const TEMP_SUFFIX: &str = "tmp";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoConfigDirectory,
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Configuration format error: {e}"),
            ConfigError::NoConfigDirectory => {
                write!(f, "Could not determine the configuration directory")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            ConfigError::NoConfigDirectory => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSettings {
    pub settings: Settings,
    /// Dotted paths of keys the file contained but nothing understands.
    pub unknown_keys: Vec<String>,
    /// True when no file existed and defaults were written.
    pub created: bool,
}

pub trait ConfigManagerOperations: Send + Sync {
    fn load_settings(&self) -> Result<LoadedSettings>;
    fn save_settings(&self, settings: &Settings) -> Result<()>;
    fn config_file_path(&self) -> Result<PathBuf>;
}

pub struct CoreConfigManager {
    config_dir: Option<PathBuf>,
}

impl CoreConfigManager {
    /// `None` means the directory could not be resolved; every operation then fails.
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        CoreConfigManager { config_dir }
    }

    fn settings_path(&self) -> Result<PathBuf> {
        self.config_dir
            .as_ref()
            .map(|dir| dir.join(SETTINGS_FILENAME))
            .ok_or(ConfigError::NoConfigDirectory)
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    fn load_settings(&self) -> Result<LoadedSettings> {
        let file_path = self.settings_path()?;
        log::trace!("CoreConfigManager: Loading settings from {file_path:?}");

        if !file_path.exists() {
            log::info!("CoreConfigManager: {file_path:?} does not exist, writing defaults.");
            let settings = Settings::default();
            self.save_settings(&settings)?;
            return Ok(LoadedSettings {
                settings,
                unknown_keys: Vec::new(),
                created: true,
            });
        }

        let contents = fs::read_to_string(&file_path)?;
        if contents.trim().is_empty() {
            log::debug!("CoreConfigManager: {file_path:?} is empty, using defaults.");
            return Ok(LoadedSettings {
                settings: Settings::default(),
                unknown_keys: Vec::new(),
                created: false,
            });
        }

        let loaded = parse_settings(&contents)?;
        log::debug!(
            "CoreConfigManager: Loaded settings from {file_path:?} ({} unknown keys).",
            loaded.unknown_keys.len()
        );
        Ok(loaded)
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        let file_path = self.settings_path()?;
        write_settings_atomically(&file_path, settings)?;
        log::debug!("CoreConfigManager: Saved settings to {file_path:?}.");
        Ok(())
    }

    fn config_file_path(&self) -> Result<PathBuf> {
        self.settings_path()
    }
}

/*
 * Parses settings text. The document is laid over the serialized defaults so
 * that a partially specified section keeps the per-state defaults for the
 * keys it leaves out, then deserialized.
 */
pub fn parse_settings(contents: &str) -> Result<LoadedSettings> {
    let document: Value = serde_json::from_str(contents)?;

    let mut unknown_keys = Vec::new();
    Settings::scan_unknown_keys(&document, &mut |key| unknown_keys.push(key));

    let mut merged = serde_json::to_value(Settings::default())?;
    merge_json(&mut merged, document);
    let settings: Settings = serde_json::from_value(merged)?;

    Ok(LoadedSettings {
        settings,
        unknown_keys,
        created: false,
    })
}

pub(crate) fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, overlay) => *base_slot = overlay,
    }
}

fn write_settings_atomically(file_path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = file_path.with_extension(TEMP_SUFFIX);
    let text = serde_json::to_string_pretty(settings)?;
    fs::write(&temp_path, text)?;
    fs::rename(&temp_path, file_path)?;
    Ok(())
}
