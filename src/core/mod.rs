/*
 * This module consolidates the core, platform-agnostic logic of the application.
 * It re-exports the appearance and settings models, the configuration manager
 * abstraction (`ConfigManagerOperations`), desktop-state resolution, the
 * window heuristics, and the tray flyout controller. Nothing in here calls
 * into the operating system, so all of it is tested on any host.
 */
pub mod appearance;
pub mod color;
pub mod config;
pub mod path_utils;
pub mod settings;
pub mod taskbar_state;
pub mod tray_menu;
pub mod window_filter;

// Re-export key structures and enums
pub use appearance::{
    AccentState, ActiveInactiveTaskbarAppearance, OptionalTaskbarAppearance, TaskbarAppearance,
    is_blur_supported,
};
pub use color::Color;
pub use settings::{IgnoredWindows, LogLevel, Settings, TaskbarState, TaskbarType};

// Re-export config related items
pub use config::{ConfigError, ConfigManagerOperations, CoreConfigManager, LoadedSettings};

pub use taskbar_state::{DesktopSnapshot, resolve_appearance, shell_state_of, system_has_battery};

pub use tray_menu::{
    AppearanceEdit, FlyoutOptions, MenuItem, MenuItemId, MenuItemKind, StartupState,
    TrayFlyoutController, TrayEvent,
};

pub use window_filter::{WindowInfo, WindowTraits, is_user_window};
