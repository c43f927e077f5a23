/*
 * The persisted user settings: one appearance per taskbar state, the windows
 * to ignore when deciding whether a window is "visible" or "maximised", and
 * a few application toggles. `Settings::default()` is what a fresh install
 * writes to disk.
 */
use super::appearance::{
    self, AccentState, ActiveInactiveTaskbarAppearance, OptionalTaskbarAppearance,
    TaskbarAppearance,
};
use super::color::Color;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SCHEMA_KEY: &str = "$schema";
const IGNORED_WINDOWS_KEYS: &[&str] = &["window_class", "window_title", "process_name"];

/*
 * The desktop conditions that can each carry their own appearance. The
 * declaration order is the order the flyout lists them in.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskbarState {
    Desktop,
    VisibleWindow,
    MaximisedWindow,
    StartOpened,
    SearchOpened,
    TaskViewOpened,
    BatterySaver,
}

impl TaskbarState {
    pub const ALL: [TaskbarState; 7] = [
        TaskbarState::Desktop,
        TaskbarState::VisibleWindow,
        TaskbarState::MaximisedWindow,
        TaskbarState::StartOpened,
        TaskbarState::SearchOpened,
        TaskbarState::TaskViewOpened,
        TaskbarState::BatterySaver,
    ];

    pub fn config_key(self) -> &'static str {
        match self {
            TaskbarState::Desktop => "desktop_appearance",
            TaskbarState::VisibleWindow => "visible_window_appearance",
            TaskbarState::MaximisedWindow => "maximised_window_appearance",
            TaskbarState::StartOpened => "start_opened_appearance",
            TaskbarState::SearchOpened => "search_opened_appearance",
            TaskbarState::TaskViewOpened => "task_view_opened_appearance",
            TaskbarState::BatterySaver => "battery_saver_appearance",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskbarState::Desktop => "Desktop",
            TaskbarState::VisibleWindow => "Visible window",
            TaskbarState::MaximisedWindow => "Maximised window",
            TaskbarState::StartOpened => "Start opened",
            TaskbarState::SearchOpened => "Search opened",
            TaskbarState::TaskViewOpened => "Task View opened",
            TaskbarState::BatterySaver => "Battery saver",
        }
    }

    /// The desktop appearance is the fallback and cannot be switched off.
    pub fn can_be_disabled(self) -> bool {
        self != TaskbarState::Desktop
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskbarType {
    /// The Win32 taskbar of Windows 10 (has the peek button).
    Classic,
    /// The XAML taskbar of Windows 11 (has the separator line).
    Xaml,
}

/// First Windows 11 build, which replaced the Win32 taskbar.
pub const XAML_TASKBAR_FROM_BUILD: u32 = 22000;

impl TaskbarType {
    pub fn for_build(os_build: u32) -> Self {
        if os_build >= XAML_TASKBAR_FROM_BUILD {
            TaskbarType::Xaml
        } else {
            TaskbarType::Classic
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Off,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Information",
            LogLevel::Warn => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Off => "Off",
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IgnoredWindows {
    pub window_class: Vec<String>,
    pub window_title: Vec<String>,
    pub process_name: Vec<String>,
}

impl IgnoredWindows {
    pub fn is_empty(&self) -> bool {
        self.window_class.is_empty()
            && self.window_title.is_empty()
            && self.process_name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub desktop_appearance: ActiveInactiveTaskbarAppearance,
    pub visible_window_appearance: OptionalTaskbarAppearance,
    pub maximised_window_appearance: OptionalTaskbarAppearance,
    pub start_opened_appearance: OptionalTaskbarAppearance,
    pub search_opened_appearance: OptionalTaskbarAppearance,
    pub task_view_opened_appearance: OptionalTaskbarAppearance,
    pub battery_saver_appearance: OptionalTaskbarAppearance,
    pub ignored_windows: IgnoredWindows,
    pub hide_tray: bool,
    pub disable_saving: bool,
    pub verbosity: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        let clear = Color::new(0, 0, 0, 0);
        Settings {
            desktop_appearance: TaskbarAppearance::new(AccentState::Clear, clear, true, true, 9.0)
                .into(),
            visible_window_appearance: OptionalTaskbarAppearance::new(
                false,
                TaskbarAppearance::with_accent(AccentState::Clear),
            ),
            maximised_window_appearance: OptionalTaskbarAppearance::new(
                true,
                TaskbarAppearance::with_accent(AccentState::Acrylic),
            ),
            start_opened_appearance: OptionalTaskbarAppearance::new(
                false,
                TaskbarAppearance::with_accent(AccentState::Normal),
            ),
            search_opened_appearance: OptionalTaskbarAppearance::new(
                false,
                TaskbarAppearance::with_accent(AccentState::Normal),
            ),
            task_view_opened_appearance: OptionalTaskbarAppearance::new(
                true,
                TaskbarAppearance::new(AccentState::Normal, clear, false, true, 9.0),
            ),
            battery_saver_appearance: OptionalTaskbarAppearance::new(
                true,
                TaskbarAppearance::new(AccentState::Opaque, clear, true, true, 9.0),
            ),
            ignored_windows: IgnoredWindows::default(),
            hide_tray: false,
            disable_saving: false,
            verbosity: LogLevel::default(),
        }
    }
}

impl Settings {
    fn optional(&self, state: TaskbarState) -> Option<&OptionalTaskbarAppearance> {
        match state {
            TaskbarState::Desktop => None,
            TaskbarState::VisibleWindow => Some(&self.visible_window_appearance),
            TaskbarState::MaximisedWindow => Some(&self.maximised_window_appearance),
            TaskbarState::StartOpened => Some(&self.start_opened_appearance),
            TaskbarState::SearchOpened => Some(&self.search_opened_appearance),
            TaskbarState::TaskViewOpened => Some(&self.task_view_opened_appearance),
            TaskbarState::BatterySaver => Some(&self.battery_saver_appearance),
        }
    }

    fn optional_mut(&mut self, state: TaskbarState) -> Option<&mut OptionalTaskbarAppearance> {
        match state {
            TaskbarState::Desktop => None,
            TaskbarState::VisibleWindow => Some(&mut self.visible_window_appearance),
            TaskbarState::MaximisedWindow => Some(&mut self.maximised_window_appearance),
            TaskbarState::StartOpened => Some(&mut self.start_opened_appearance),
            TaskbarState::SearchOpened => Some(&mut self.search_opened_appearance),
            TaskbarState::TaskViewOpened => Some(&mut self.task_view_opened_appearance),
            TaskbarState::BatterySaver => Some(&mut self.battery_saver_appearance),
        }
    }

    /*
     * Returns the appearance configured for `state` together with its enabled
     * flag. `None` for the flag means the state has no such flag (the desktop)
     * and is always in effect.
     */
    pub fn appearance(&self, state: TaskbarState) -> (&ActiveInactiveTaskbarAppearance, Option<bool>) {
        match self.optional(state) {
            Some(optional) => (&optional.appearance, Some(optional.enabled)),
            None => (&self.desktop_appearance, None),
        }
    }

    pub fn is_enabled(&self, state: TaskbarState) -> bool {
        self.appearance(state).1.unwrap_or(true)
    }

    pub fn appearance_mut(&mut self, state: TaskbarState) -> &mut TaskbarAppearance {
        match state {
            TaskbarState::Desktop => &mut self.desktop_appearance.active,
            TaskbarState::VisibleWindow => &mut self.visible_window_appearance.appearance.active,
            TaskbarState::MaximisedWindow => {
                &mut self.maximised_window_appearance.appearance.active
            }
            TaskbarState::StartOpened => &mut self.start_opened_appearance.appearance.active,
            TaskbarState::SearchOpened => &mut self.search_opened_appearance.appearance.active,
            TaskbarState::TaskViewOpened => {
                &mut self.task_view_opened_appearance.appearance.active
            }
            TaskbarState::BatterySaver => &mut self.battery_saver_appearance.appearance.active,
        }
    }

    /// No-op for the desktop state.
    pub fn set_enabled(&mut self, state: TaskbarState, enabled: bool) {
        if let Some(optional) = self.optional_mut(state) {
            optional.enabled = enabled;
        }
    }

    pub fn scan_unknown_keys(value: &Value, report: &mut dyn FnMut(String)) {
        let mut known: Vec<&str> = TaskbarState::ALL.iter().map(|s| s.config_key()).collect();
        known.extend_from_slice(&[
            SCHEMA_KEY,
            "ignored_windows",
            "hide_tray",
            "disable_saving",
            "verbosity",
        ]);
        appearance::scan_object(value, "", &known, report);

        for state in TaskbarState::ALL {
            let key = state.config_key();
            if let Some(section) = value.get(key) {
                if state == TaskbarState::Desktop {
                    ActiveInactiveTaskbarAppearance::scan_unknown_keys(section, key, report);
                } else {
                    OptionalTaskbarAppearance::scan_unknown_keys(section, key, report);
                }
            }
        }

        if let Some(ignored) = value.get("ignored_windows") {
            appearance::scan_object(ignored, "ignored_windows", IGNORED_WINDOWS_KEYS, report);
        }
    }
}
