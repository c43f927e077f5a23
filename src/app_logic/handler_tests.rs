use super::handler::*;
use crate::app_logic::ui_constants;

use crate::core::{
    AccentState, Color, ConfigError, ConfigManagerOperations, DesktopSnapshot, LoadedSettings,
    LogLevel, MenuItem, MenuItemId, MenuItemKind, Settings, StartupState, TaskbarState,
    TaskbarType, tray_menu::MenuTag, tray_menu::TrayCommand,
};
use crate::platform_layer::{AppEvent, EnvironmentInfo, PlatformCommand, PlatformEventHandler};

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/*
 * This module contains unit tests for `TrayAppLogic` from the `super::handler`
 * module. It uses a mock `ConfigManagerOperations` to isolate the presenter
 * from the file system. Tests drive it with `AppEvent`s and inspect the
 * commands it enqueues.
 */

// --- MockConfigManager ---
enum MockLoad {
    Ok(LoadedSettings),
    NoDirectory,
    Malformed,
}

struct MockConfigManager {
    load_result: Mutex<MockLoad>,
    saved: Mutex<Vec<Settings>>,
}

impl MockConfigManager {
    fn new() -> Self {
        MockConfigManager {
            load_result: Mutex::new(MockLoad::Ok(LoadedSettings {
                settings: Settings::default(),
                unknown_keys: Vec::new(),
                created: false,
            })),
            saved: Mutex::new(Vec::new()),
        }
    }

    fn set_load_settings(&self, settings: Settings) {
        *self.load_result.lock().unwrap() = MockLoad::Ok(LoadedSettings {
            settings,
            unknown_keys: vec!["mystery".to_string()],
            created: false,
        });
    }

    fn set_load_result(&self, result: MockLoad) {
        *self.load_result.lock().unwrap() = result;
    }

    fn saved(&self) -> Vec<Settings> {
        self.saved.lock().unwrap().clone()
    }
}

impl ConfigManagerOperations for MockConfigManager {
    fn load_settings(&self) -> Result<LoadedSettings, ConfigError> {
        match &*self.load_result.lock().unwrap() {
            MockLoad::Ok(loaded) => Ok(loaded.clone()),
            MockLoad::NoDirectory => Err(ConfigError::NoConfigDirectory),
            MockLoad::Malformed => Err(ConfigError::Serde(
                serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
            )),
        }
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), ConfigError> {
        self.saved.lock().unwrap().push(settings.clone());
        Ok(())
    }

    fn config_file_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(PathBuf::from("/mock/config/settings.json"))
    }
}

struct FailingSaveConfigManager;

impl ConfigManagerOperations for FailingSaveConfigManager {
    fn load_settings(&self) -> Result<LoadedSettings, ConfigError> {
        Err(ConfigError::NoConfigDirectory)
    }
    fn save_settings(&self, _settings: &Settings) -> Result<(), ConfigError> {
        Err(ConfigError::Io(io::Error::other("disk full")))
    }
    fn config_file_path(&self) -> Result<PathBuf, ConfigError> {
        Err(ConfigError::NoConfigDirectory)
    }
}
// --- End MockConfigManager ---

fn environment() -> EnvironmentInfo {
    EnvironmentInfo {
        has_package_identity: true,
        system_has_battery: true,
        os_build: 19045,
        taskbar_type: TaskbarType::Classic,
    }
}

fn setup_logic() -> (TrayAppLogic, Arc<MockConfigManager>) {
    let mock = Arc::new(MockConfigManager::new());
    let logic = TrayAppLogic::new(mock.clone(), Some(PathBuf::from("/mock/config/tintbar.log")));
    (logic, mock)
}

fn started_logic() -> (TrayAppLogic, Arc<MockConfigManager>) {
    let (mut logic, mock) = setup_logic();
    logic.handle_event(AppEvent::TrayStarted {
        environment: environment(),
        startup_state: Some(StartupState::Disabled),
    });
    drain(&mut logic);
    (logic, mock)
}

fn drain(logic: &mut TrayAppLogic) -> Vec<PlatformCommand> {
    let mut commands = Vec::new();
    while let Some(command) = logic.try_dequeue_command() {
        commands.push(command);
    }
    commands
}

fn find_item(items: &[MenuItem], predicate: &dyn Fn(&MenuItem) -> bool) -> Option<MenuItem> {
    for item in items {
        if predicate(item) {
            return Some(item.clone());
        }
        if let Some(found) = find_item(&item.children, predicate) {
            return Some(found);
        }
    }
    None
}

fn open_menu(logic: &mut TrayAppLogic) -> Vec<MenuItem> {
    logic.handle_event(AppEvent::TrayMenuRequested);
    match drain(logic).pop() {
        Some(PlatformCommand::ShowTrayMenu { items }) => items,
        other => panic!("expected ShowTrayMenu, got {other:?}"),
    }
}

fn state_item(items: &[MenuItem], state: TaskbarState, tag: MenuTag) -> MenuItemId {
    let submenu = find_item(items, &|item| item.tag == MenuTag::State(state))
        .unwrap_or_else(|| panic!("no submenu for {state:?}"));
    submenu
        .children
        .iter()
        .find(|item| item.tag == tag)
        .map(|item| item.id)
        .unwrap_or_else(|| panic!("no {tag:?} in {state:?}"))
}

fn command_item(items: &[MenuItem], command: TrayCommand) -> MenuItemId {
    find_item(items, &|item| item.tag == MenuTag::Command(command))
        .map(|item| item.id)
        .unwrap_or_else(|| panic!("no {command:?} item"))
}

fn applied_state(commands: &[PlatformCommand]) -> Option<(TaskbarState, AccentState)> {
    commands.iter().rev().find_map(|command| match command {
        PlatformCommand::ApplyTaskbarAppearance { state, focused, .. } => {
            Some((*state, focused.accent))
        }
        _ => None,
    })
}

#[test]
fn test_tray_started_loads_settings_and_applies() {
    // Arrange
    let (mut logic, mock) = setup_logic();
    let mut settings = Settings::default();
    settings.verbosity = LogLevel::Debug;
    settings.hide_tray = true;
    mock.set_load_settings(settings);

    // Act
    logic.handle_event(AppEvent::TrayStarted {
        environment: environment(),
        startup_state: None,
    });
    let commands = drain(&mut logic);

    // Assert
    assert!(commands.contains(&PlatformCommand::SetLogLevel(LogLevel::Debug)));
    assert!(commands.contains(&PlatformCommand::SetTrayIconVisible(false)));
    assert!(commands.contains(&PlatformCommand::SetIgnoredWindows(Default::default())));
    assert_eq!(
        applied_state(&commands),
        Some((TaskbarState::Desktop, AccentState::Clear))
    );
    assert!(logic.flyout.is_some());
    assert!(mock.saved().is_empty(), "startup must not rewrite settings");
}

#[test]
fn test_load_failure_keeps_defaults_and_blocks_saving_on_malformed_file() {
    let (mut logic, mock) = setup_logic();
    mock.set_load_result(MockLoad::Malformed);

    logic.handle_event(AppEvent::TrayStarted {
        environment: environment(),
        startup_state: None,
    });
    drain(&mut logic);
    assert_eq!(logic.settings, Settings::default());
    assert!(logic.saving_blocked);

    logic.on_quit();
    assert!(mock.saved().is_empty());
}

#[test]
fn test_missing_config_directory_does_not_block_saving() {
    let (mut logic, mock) = setup_logic();
    mock.set_load_result(MockLoad::NoDirectory);

    logic.handle_event(AppEvent::TrayStarted {
        environment: environment(),
        startup_state: None,
    });
    assert!(!logic.saving_blocked);
    logic.on_quit();
    assert_eq!(mock.saved().len(), 1);
}

#[test]
fn test_desktop_state_changes_are_deduplicated() {
    let (mut logic, _mock) = started_logic();
    let snapshot = DesktopSnapshot {
        maximised_window: true,
        ..Default::default()
    };

    logic.handle_event(AppEvent::DesktopStateChanged { snapshot });
    let first = drain(&mut logic);
    assert_eq!(
        applied_state(&first),
        Some((TaskbarState::MaximisedWindow, AccentState::Acrylic))
    );

    logic.handle_event(AppEvent::DesktopStateChanged { snapshot });
    assert!(drain(&mut logic).is_empty());

    // Visible window is disabled by default, so this resolves to the desktop.
    logic.handle_event(AppEvent::DesktopStateChanged {
        snapshot: DesktopSnapshot {
            visible_window: true,
            ..Default::default()
        },
    });
    assert_eq!(
        applied_state(&drain(&mut logic)),
        Some((TaskbarState::Desktop, AccentState::Clear))
    );
}

#[test]
fn test_menu_request_before_start_is_ignored() {
    let (mut logic, _mock) = setup_logic();
    logic.handle_event(AppEvent::TrayMenuRequested);
    assert!(drain(&mut logic).is_empty());
}

#[test]
fn test_menu_reflects_settings() {
    let (mut logic, _mock) = started_logic();
    let items = open_menu(&mut logic);

    let maximised = find_item(&items, &|item| {
        item.tag == MenuTag::State(TaskbarState::MaximisedWindow)
    })
    .unwrap();
    let acrylic = maximised
        .children
        .iter()
        .find(|item| item.tag == MenuTag::Accent(AccentState::Acrylic))
        .unwrap();
    assert!(acrylic.checked);

    let warn = find_item(&items, &|item| item.tag == MenuTag::LogLevel(LogLevel::Warn)).unwrap();
    assert!(warn.checked);

    // Classic taskbar: peek visible, line hidden.
    let line = find_item(&items, &|item| item.tag == MenuTag::ShowLine).unwrap();
    assert!(!line.visible);

    let startup = find_item(&items, &|item| {
        item.tag == MenuTag::Command(TrayCommand::Startup)
    })
    .unwrap();
    assert_eq!(startup.kind, MenuItemKind::Toggle);
    assert!(!startup.checked && startup.enabled);
}

#[test]
fn test_accent_click_updates_saves_and_reapplies() {
    let (mut logic, mock) = started_logic();
    let items = open_menu(&mut logic);
    let opaque = state_item(&items, TaskbarState::Desktop, MenuTag::Accent(AccentState::Opaque));

    logic.handle_event(AppEvent::TrayMenuItemClicked { item_id: opaque });
    let commands = drain(&mut logic);

    assert_eq!(
        logic.settings.desktop_appearance.active.accent,
        AccentState::Opaque
    );
    assert_eq!(mock.saved().len(), 1);
    assert_eq!(
        applied_state(&commands),
        Some((TaskbarState::Desktop, AccentState::Opaque))
    );
}

#[test]
fn test_enabled_toggle_enables_state() {
    let (mut logic, _mock) = started_logic();
    let items = open_menu(&mut logic);
    let enabled = state_item(&items, TaskbarState::StartOpened, MenuTag::Enabled);

    logic.handle_event(AppEvent::TrayMenuItemClicked { item_id: enabled });
    drain(&mut logic);

    assert!(logic.settings.start_opened_appearance.enabled);
    logic.handle_event(AppEvent::DesktopStateChanged {
        snapshot: DesktopSnapshot {
            start_opened: true,
            ..Default::default()
        },
    });
    assert_eq!(
        applied_state(&drain(&mut logic)),
        Some((TaskbarState::StartOpened, AccentState::Normal))
    );
}

#[test]
fn test_color_flow() {
    let (mut logic, mock) = started_logic();
    let items = open_menu(&mut logic);
    let color = state_item(&items, TaskbarState::Desktop, MenuTag::Color);
    let before = logic.settings.clone();

    logic.handle_event(AppEvent::TrayMenuItemClicked { item_id: color });
    assert_eq!(
        drain(&mut logic),
        vec![PlatformCommand::ShowColorPicker {
            state: TaskbarState::Desktop,
            initial: Color::new(0, 0, 0, 0),
        }]
    );
    // Opening the picker only reads the current color.
    assert_eq!(logic.settings, before);

    logic.handle_event(AppEvent::ColorPicked {
        state: TaskbarState::Desktop,
        color: None,
    });
    assert!(drain(&mut logic).is_empty());
    assert!(mock.saved().is_empty());

    let picked = Color::new(0x20, 0x40, 0x60, 0x80);
    logic.handle_event(AppEvent::ColorPicked {
        state: TaskbarState::Desktop,
        color: Some(picked),
    });
    let commands = drain(&mut logic);
    assert_eq!(logic.settings.desktop_appearance.active.color, picked);
    assert_eq!(mock.saved().len(), 1);
    assert!(commands.iter().any(|c| matches!(
        c,
        PlatformCommand::ApplyTaskbarAppearance { focused, .. } if focused.color == picked
    )));
}

#[test]
fn test_log_level_click() {
    let (mut logic, _mock) = started_logic();
    let items = open_menu(&mut logic);
    let trace = find_item(&items, &|item| item.tag == MenuTag::LogLevel(LogLevel::Trace))
        .unwrap()
        .id;

    logic.handle_event(AppEvent::TrayMenuItemClicked { item_id: trace });

    assert_eq!(
        drain(&mut logic),
        vec![PlatformCommand::SetLogLevel(LogLevel::Trace)]
    );
    assert_eq!(logic.settings.verbosity, LogLevel::Trace);
}

#[test]
fn test_disable_saving_persists_flag_then_suppresses_saves() {
    let (mut logic, mock) = started_logic();
    let items = open_menu(&mut logic);
    let toggle = command_item(&items, TrayCommand::DisableSavingSettings);

    logic.handle_event(AppEvent::TrayMenuItemClicked { item_id: toggle });
    let saved = mock.saved();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].disable_saving);

    let opaque = state_item(&items, TaskbarState::Desktop, MenuTag::Accent(AccentState::Opaque));
    logic.handle_event(AppEvent::TrayMenuItemClicked { item_id: opaque });
    logic.on_quit();
    assert_eq!(mock.saved().len(), 1);
}

#[test]
fn test_simple_commands_map_to_platform_commands() {
    let (mut logic, _mock) = started_logic();
    let items = open_menu(&mut logic);

    let cases = [
        (
            TrayCommand::OpenLogFile,
            PlatformCommand::OpenPath(PathBuf::from("/mock/config/tintbar.log")),
        ),
        (
            TrayCommand::EditSettings,
            PlatformCommand::OpenPath(PathBuf::from("/mock/config/settings.json")),
        ),
        (TrayCommand::Startup, PlatformCommand::ToggleStartupTask),
        (
            TrayCommand::TipsAndTricks,
            PlatformCommand::LaunchUri(ui_constants::TIPS_AND_TRICKS_URI.to_string()),
        ),
        (
            TrayCommand::About,
            PlatformCommand::LaunchUri(ui_constants::ABOUT_URI.to_string()),
        ),
        (TrayCommand::DumpDynamicState, PlatformCommand::DumpDynamicState),
        (TrayCommand::Exit, PlatformCommand::QuitApplication),
    ];

    for (command, expected) in cases {
        logic.handle_event(AppEvent::TrayMenuItemClicked {
            item_id: command_item(&items, command),
        });
        let commands = drain(&mut logic);
        assert_eq!(commands, vec![expected], "{command:?}");
    }
}

#[test]
fn test_hide_tray_persists_and_hides_icon() {
    let (mut logic, mock) = started_logic();
    let items = open_menu(&mut logic);

    logic.handle_event(AppEvent::TrayMenuItemClicked {
        item_id: command_item(&items, TrayCommand::HideTray),
    });

    assert_eq!(
        drain(&mut logic),
        vec![PlatformCommand::SetTrayIconVisible(false)]
    );
    assert!(mock.saved().last().unwrap().hide_tray);
}

#[test]
fn test_reset_settings_restores_defaults() {
    let (mut logic, mock) = started_logic();
    logic.settings.verbosity = LogLevel::Trace;
    logic.settings.hide_tray = true;
    let items = open_menu(&mut logic);

    logic.handle_event(AppEvent::TrayMenuItemClicked {
        item_id: command_item(&items, TrayCommand::ResetSettings),
    });
    let commands = drain(&mut logic);

    assert_eq!(logic.settings, Settings::default());
    assert_eq!(mock.saved().last(), Some(&Settings::default()));
    assert!(commands.contains(&PlatformCommand::SetLogLevel(LogLevel::Warn)));
    assert!(commands.contains(&PlatformCommand::SetTrayIconVisible(true)));
    assert!(applied_state(&commands).is_some());
}

#[test]
fn test_reset_dynamic_state_forces_reapply() {
    let (mut logic, _mock) = started_logic();
    let items = open_menu(&mut logic);

    logic.handle_event(AppEvent::TrayMenuItemClicked {
        item_id: command_item(&items, TrayCommand::ResetDynamicState),
    });
    let commands = drain(&mut logic);

    assert_eq!(commands[0], PlatformCommand::ResetDynamicState);
    assert_eq!(
        applied_state(&commands),
        Some((TaskbarState::Desktop, AccentState::Clear))
    );
}

#[test]
fn test_config_file_changed_reloads_only_on_difference() {
    let (mut logic, mock) = started_logic();

    logic.handle_event(AppEvent::ConfigFileChanged);
    assert!(drain(&mut logic).is_empty());

    let mut edited = Settings::default();
    edited.desktop_appearance.active.accent = AccentState::Acrylic;
    mock.set_load_settings(edited.clone());
    logic.handle_event(AppEvent::ConfigFileChanged);
    let commands = drain(&mut logic);

    assert_eq!(logic.settings, edited);
    assert_eq!(
        applied_state(&commands),
        Some((TaskbarState::Desktop, AccentState::Acrylic))
    );
}

#[test]
fn test_config_file_changed_to_broken_file_keeps_current_settings() {
    let (mut logic, mock) = started_logic();
    logic.settings.verbosity = LogLevel::Info;
    mock.set_load_result(MockLoad::Malformed);

    logic.handle_event(AppEvent::ConfigFileChanged);

    assert_eq!(logic.settings.verbosity, LogLevel::Info);
    assert!(drain(&mut logic).is_empty());
}

#[test]
fn test_taskbar_created_reapplies_even_if_unchanged() {
    let (mut logic, _mock) = started_logic();

    logic.handle_event(AppEvent::TaskbarCreated);
    let commands = drain(&mut logic);

    assert_eq!(commands[0], PlatformCommand::SetTrayIconVisible(true));
    assert!(applied_state(&commands).is_some());
}

#[test]
fn test_startup_state_report_is_reflected_in_menu() {
    let (mut logic, _mock) = started_logic();
    logic.handle_event(AppEvent::StartupStateReported {
        state: Some(StartupState::Enabled),
    });
    let items = open_menu(&mut logic);
    let startup = find_item(&items, &|item| {
        item.tag == MenuTag::Command(TrayCommand::Startup)
    })
    .unwrap();
    assert!(startup.checked);
}

#[test]
fn test_startup_entry_stays_disabled_without_a_report() {
    let (mut logic, _mock) = setup_logic();
    logic.handle_event(AppEvent::TrayStarted {
        environment: environment(),
        startup_state: None,
    });
    drain(&mut logic);

    let items = open_menu(&mut logic);
    let startup = find_item(&items, &|item| {
        item.tag == MenuTag::Command(TrayCommand::Startup)
    })
    .unwrap();
    assert!(startup.visible);
    assert!(!startup.enabled);
    assert!(!startup.checked);

    // A click on the disabled entry does not reach the startup task.
    logic.handle_event(AppEvent::TrayMenuItemClicked { item_id: startup.id });
    assert!(drain(&mut logic).is_empty());
}

#[test]
fn test_save_failure_is_logged_not_fatal() {
    let mut logic = TrayAppLogic::new(Arc::new(FailingSaveConfigManager), None);
    logic.handle_event(AppEvent::TrayStarted {
        environment: environment(),
        startup_state: None,
    });
    drain(&mut logic);
    logic.on_quit();

    // No log file configured: opening it enqueues nothing.
    let items = open_menu(&mut logic);
    logic.handle_event(AppEvent::TrayMenuItemClicked {
        item_id: command_item(&items, TrayCommand::OpenLogFile),
    });
    assert!(drain(&mut logic).is_empty());
}
