/*
 * This module defines the data types used for communication between the
 * application logic and the platform layer: platform-agnostic events
 * (`AppEvent`), commands for the platform layer (`PlatformCommand`), and the
 * `PlatformEventHandler` trait that the application logic implements. None
 * of these types mention native handles, so they compile on every host.
 */

use crate::core::{
    Color, DesktopSnapshot, IgnoredWindows, LogLevel, MenuItem, MenuItemId, StartupState,
    TaskbarAppearance, TaskbarState, TaskbarType,
};
use std::path::PathBuf;

// What the platform layer found out about the machine while starting up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentInfo {
    pub has_package_identity: bool,
    pub system_has_battery: bool,
    pub os_build: u32,
    pub taskbar_type: TaskbarType,
}

// --- Events from Platform to App Logic ---

/*
 * Represents platform-agnostic events generated by the native side.
 *
 * The platform layer translates tray icon messages, flyout clicks, polling
 * results and dialog outcomes into these and hands them to the application
 * logic.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // The UI thread, tray icon and taskbar discovery are ready.
    TrayStarted {
        environment: EnvironmentInfo,
        startup_state: Option<StartupState>,
    },
    // A new poll of the desktop finished.
    DesktopStateChanged {
        snapshot: DesktopSnapshot,
    },
    // The user asked for the flyout (tray icon click).
    TrayMenuRequested,
    TrayMenuItemClicked {
        item_id: MenuItemId,
    },
    // The color dialog closed. `None` when the user cancelled.
    ColorPicked {
        state: TaskbarState,
        color: Option<Color>,
    },
    // The settings file changed on disk.
    ConfigFileChanged,
    // Explorer restarted; the tray icon and taskbar handles were recreated.
    TaskbarCreated,
    StartupStateReported {
        state: Option<StartupState>,
    },
}

// Represents platform-agnostic commands sent from the application logic to the platform layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCommand {
    SetLogLevel(LogLevel),
    SetTrayIconVisible(bool),
    // Windows matching these never count as visible or maximised.
    SetIgnoredWindows(IgnoredWindows),
    // `focused` goes to the taskbar on the monitor holding the foreground
    // window, `unfocused` to every other taskbar.
    ApplyTaskbarAppearance {
        state: TaskbarState,
        focused: TaskbarAppearance,
        unfocused: TaskbarAppearance,
    },
    ShowTrayMenu {
        items: Vec<MenuItem>,
    },
    ShowColorPicker {
        state: TaskbarState,
        initial: Color,
    },
    OpenPath(PathBuf),
    LaunchUri(String),
    ToggleStartupTask,
    // Forget cached taskbar handles and restore every taskbar before reapplying.
    ResetDynamicState,
    DumpDynamicState,
    QuitApplication,
}

// --- Trait for App Logic to Handle Events ---

// A trait to be implemented by the application logic layer to handle platform events.
pub trait PlatformEventHandler: Send + Sync + 'static {
    // Called by the platform layer when an event has been produced.
    // The implementor should handle the event and enqueue `PlatformCommand`s
    // for the platform layer to execute.
    fn handle_event(&mut self, event: AppEvent);

    // Called by the platform layer when the application is about to exit its main loop.
    fn on_quit(&mut self) {}

    // Attempts to dequeue a single `PlatformCommand` from the internal queue.
    fn try_dequeue_command(&mut self) -> Option<PlatformCommand>;
}
