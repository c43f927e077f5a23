/*
 * Resolves which configured appearance applies given what is currently
 * happening on the desktop.
 */
use super::appearance::TaskbarAppearance;
use super::settings::{Settings, TaskbarState};
use super::window_filter::WindowInfo;

// Class of the frame that Start and Search run in.
const CORE_WINDOW_CLASS: &str = "Windows.UI.Core.CoreWindow";
const START_HOSTS: &[&str] = &["StartMenuExperienceHost.exe"];
const SEARCH_HOSTS: &[&str] = &["SearchHost.exe", "SearchApp.exe", "SearchUI.exe"];
// Windows 10 and Windows 11 task view frames.
const TASK_VIEW_CLASSES: &[&str] = &["MultitaskingViewFrame", "XamlExplorerHostIslandWindow"];

// `BatteryFlag` value of the system power status meaning "no system battery".
pub const BATTERY_FLAG_NO_BATTERY: u8 = 128;

/*
 * Whether the machine has a battery, given the power status `BatteryFlag`
 * or `None` when the query failed. Only an explicit "no system battery"
 * rules it out; an unknown status still counts as having one.
 */
pub fn system_has_battery(battery_flag: Option<u8>) -> bool {
    battery_flag != Some(BATTERY_FLAG_NO_BATTERY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DesktopSnapshot {
    pub start_opened: bool,
    pub search_opened: bool,
    pub task_view_opened: bool,
    pub maximised_window: bool,
    pub visible_window: bool,
    pub battery_saver: bool,
}

impl DesktopSnapshot {
    fn is_active(&self, state: TaskbarState) -> bool {
        match state {
            TaskbarState::Desktop => true,
            TaskbarState::VisibleWindow => self.visible_window,
            TaskbarState::MaximisedWindow => self.maximised_window,
            TaskbarState::StartOpened => self.start_opened,
            TaskbarState::SearchOpened => self.search_opened,
            TaskbarState::TaskViewOpened => self.task_view_opened,
            TaskbarState::BatterySaver => self.battery_saver,
        }
    }
}

/// Highest priority first. The desktop is the unconditional fallback.
pub const PRIORITY: [TaskbarState; 7] = [
    TaskbarState::TaskViewOpened,
    TaskbarState::StartOpened,
    TaskbarState::SearchOpened,
    TaskbarState::MaximisedWindow,
    TaskbarState::VisibleWindow,
    TaskbarState::BatterySaver,
    TaskbarState::Desktop,
];

pub fn resolve(settings: &Settings, snapshot: &DesktopSnapshot) -> TaskbarState {
    PRIORITY
        .into_iter()
        .find(|state| snapshot.is_active(*state) && settings.is_enabled(*state))
        .unwrap_or(TaskbarState::Desktop)
}

pub fn resolve_appearance(
    settings: &Settings,
    snapshot: &DesktopSnapshot,
    focused: bool,
) -> (TaskbarState, TaskbarAppearance) {
    let state = resolve(settings, snapshot);
    let (appearance, _) = settings.appearance(state);
    (state, *appearance.for_focus(focused))
}

/*
 * Recognises the shell surfaces that have their own taskbar state from the
 * foreground window: Start and Search by their host process, task view by
 * its frame class.
 */
pub fn shell_state_of(foreground: &WindowInfo) -> Option<TaskbarState> {
    let class_name = foreground.class_name.as_deref()?;
    if TASK_VIEW_CLASSES.contains(&class_name) {
        return Some(TaskbarState::TaskViewOpened);
    }
    if class_name != CORE_WINDOW_CLASS {
        return None;
    }

    let file_name = foreground
        .file
        .as_deref()
        .and_then(|path| path.to_str())
        .and_then(|path| path.rsplit(['\\', '/']).next())?;
    let is_host = |hosts: &[&str]| hosts.iter().any(|h| h.eq_ignore_ascii_case(file_name));
    if is_host(START_HOSTS) {
        Some(TaskbarState::StartOpened)
    } else if is_host(SEARCH_HOSTS) {
        Some(TaskbarState::SearchOpened)
    } else {
        None
    }
}

impl DesktopSnapshot {
    /// Sets the flag that belongs to a shell surface state.
    pub fn mark_shell_state(&mut self, state: TaskbarState) {
        match state {
            TaskbarState::StartOpened => self.start_opened = true,
            TaskbarState::SearchOpened => self.search_opened = true,
            TaskbarState::TaskViewOpened => self.task_view_opened = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::appearance::AccentState;

    fn all_enabled() -> Settings {
        let mut settings = Settings::default();
        for state in TaskbarState::ALL {
            settings.set_enabled(state, true);
        }
        settings
    }

    #[test]
    fn test_quiet_desktop_resolves_to_desktop() {
        let settings = Settings::default();
        assert_eq!(
            resolve(&settings, &DesktopSnapshot::default()),
            TaskbarState::Desktop
        );
    }

    #[test]
    fn test_priority_order_with_everything_enabled() {
        let settings = all_enabled();
        let mut snapshot = DesktopSnapshot {
            start_opened: true,
            search_opened: true,
            task_view_opened: true,
            maximised_window: true,
            visible_window: true,
            battery_saver: true,
        };

        assert_eq!(resolve(&settings, &snapshot), TaskbarState::TaskViewOpened);
        snapshot.task_view_opened = false;
        assert_eq!(resolve(&settings, &snapshot), TaskbarState::StartOpened);
        snapshot.start_opened = false;
        assert_eq!(resolve(&settings, &snapshot), TaskbarState::SearchOpened);
        snapshot.search_opened = false;
        assert_eq!(resolve(&settings, &snapshot), TaskbarState::MaximisedWindow);
        snapshot.maximised_window = false;
        assert_eq!(resolve(&settings, &snapshot), TaskbarState::VisibleWindow);
        snapshot.visible_window = false;
        assert_eq!(resolve(&settings, &snapshot), TaskbarState::BatterySaver);
        snapshot.battery_saver = false;
        assert_eq!(resolve(&settings, &snapshot), TaskbarState::Desktop);
    }

    #[test]
    fn test_disabled_state_falls_through() {
        // Visible window is disabled by default; the maximised window state
        // is enabled.
        let settings = Settings::default();
        let snapshot = DesktopSnapshot {
            start_opened: true,
            visible_window: true,
            ..Default::default()
        };
        assert_eq!(resolve(&settings, &snapshot), TaskbarState::Desktop);

        let snapshot = DesktopSnapshot {
            start_opened: true,
            maximised_window: true,
            ..Default::default()
        };
        assert_eq!(resolve(&settings, &snapshot), TaskbarState::MaximisedWindow);
    }

    fn info(class_name: &str, file: &str) -> WindowInfo {
        WindowInfo {
            class_name: Some(class_name.to_string()),
            title: Some(String::new()),
            file: Some(std::path::PathBuf::from(file)),
        }
    }

    #[test]
    fn test_system_has_battery_from_flag() {
        assert!(!system_has_battery(Some(BATTERY_FLAG_NO_BATTERY)));
        // Unknown status.
        assert!(system_has_battery(Some(255)));
        assert!(system_has_battery(Some(0)));
        // High, charging.
        assert!(system_has_battery(Some(1 | 8)));
        // The power status query failed.
        assert!(system_has_battery(None));
    }

    #[test]
    fn test_shell_state_of_foreground_window() {
        assert_eq!(
            shell_state_of(&info(
                CORE_WINDOW_CLASS,
                r"C:\Windows\SystemApps\StartMenuExperienceHost.exe"
            )),
            Some(TaskbarState::StartOpened)
        );
        assert_eq!(
            shell_state_of(&info(
                CORE_WINDOW_CLASS,
                r"\Device\HarddiskVolume3\Windows\SystemApps\searchhost.exe"
            )),
            Some(TaskbarState::SearchOpened)
        );
        assert_eq!(
            shell_state_of(&info("MultitaskingViewFrame", r"C:\Windows\explorer.exe")),
            Some(TaskbarState::TaskViewOpened)
        );
        assert_eq!(
            shell_state_of(&info(CORE_WINDOW_CLASS, r"C:\Program Files\App\app.exe")),
            None
        );
        assert_eq!(shell_state_of(&info("Notepad", r"C:\Windows\notepad.exe")), None);
        assert_eq!(shell_state_of(&WindowInfo::default()), None);
    }

    #[test]
    fn test_mark_shell_state_sets_matching_flag() {
        let mut snapshot = DesktopSnapshot::default();
        snapshot.mark_shell_state(TaskbarState::SearchOpened);
        snapshot.mark_shell_state(TaskbarState::MaximisedWindow);
        assert_eq!(
            snapshot,
            DesktopSnapshot {
                search_opened: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_resolve_appearance_uses_inactive_variant_when_unfocused() {
        let mut settings = Settings::default();
        settings.desktop_appearance.inactive =
            Some(TaskbarAppearance::with_accent(AccentState::Opaque));

        let snapshot = DesktopSnapshot::default();
        let (state, focused) = resolve_appearance(&settings, &snapshot, true);
        assert_eq!(state, TaskbarState::Desktop);
        assert_eq!(focused.accent, AccentState::Clear);

        let (_, unfocused) = resolve_appearance(&settings, &snapshot, false);
        assert_eq!(unfocused.accent, AccentState::Opaque);
    }
}
