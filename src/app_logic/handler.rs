use crate::app_logic::ui_constants;
use crate::core::{
    self, ConfigManagerOperations, DesktopSnapshot, FlyoutOptions, Settings, StartupState,
    TaskbarState, TrayEvent, TrayFlyoutController,
};
use crate::platform_layer::{AppEvent, EnvironmentInfo, PlatformCommand, PlatformEventHandler};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use time::macros::format_description;

/*
 * Manages the application state and tray logic in a platform-agnostic manner.
 * It processes events received from the platform layer and enqueues commands
 * for it. Settings are read and written through a `ConfigManagerOperations`
 * implementation so tests can substitute an in-memory one.
 */
pub struct TrayAppLogic {
    pub(crate) config_manager: Arc<dyn ConfigManagerOperations>,
    pub(crate) settings: Settings,
    pub(crate) flyout: Option<TrayFlyoutController>,
    pub(crate) environment: Option<EnvironmentInfo>,
    pub(crate) startup_state: Option<StartupState>,
    pub(crate) last_snapshot: DesktopSnapshot,
    pub(crate) last_applied: Option<PlatformCommand>,
    pub(crate) log_file_path: Option<PathBuf>,
    // Set when the settings file exists but could not be parsed; writing
    // would replace the user's file with defaults.
    pub(crate) saving_blocked: bool,
    command_queue: VecDeque<PlatformCommand>,
}

impl TrayAppLogic {
    pub fn new(
        config_manager: Arc<dyn ConfigManagerOperations>,
        log_file_path: Option<PathBuf>,
    ) -> Self {
        TrayAppLogic {
            config_manager,
            settings: Settings::default(),
            flyout: None,
            environment: None,
            startup_state: None,
            last_snapshot: DesktopSnapshot::default(),
            last_applied: None,
            log_file_path,
            saving_blocked: false,
            command_queue: VecDeque::new(),
        }
    }

    fn enqueue(&mut self, command: PlatformCommand) {
        log::trace!("TrayAppLogic: Enqueuing {command:?}");
        self.command_queue.push_back(command);
    }

    /*
     * Loads settings through the config manager. On failure the defaults stay
     * in effect; a parse failure also blocks saving until the user fixes or
     * resets the file.
     */
    fn load_settings(&mut self) -> bool {
        match self.config_manager.load_settings() {
            Ok(loaded) => {
                for key in &loaded.unknown_keys {
                    log::warn!("TrayAppLogic: Unknown key '{key}' in settings, ignoring it.");
                }
                if loaded.created {
                    log::info!("TrayAppLogic: Created default settings file.");
                }
                self.settings = loaded.settings;
                self.saving_blocked = false;
                true
            }
            Err(e) => {
                log::error!("TrayAppLogic: Failed to load settings: {e}. Using defaults.");
                self.saving_blocked = matches!(e, core::ConfigError::Serde(_));
                false
            }
        }
    }

    fn save_settings(&mut self, force: bool) {
        if self.saving_blocked {
            log::warn!("TrayAppLogic: Not saving settings, the file on disk failed to load.");
            return;
        }
        if self.settings.disable_saving && !force {
            log::debug!("TrayAppLogic: Saving settings is disabled.");
            return;
        }
        if let Err(e) = self.config_manager.save_settings(&self.settings) {
            log::error!("TrayAppLogic: Failed to save settings: {e}");
        }
    }

    /*
     * Resolves the appearance for the last desktop snapshot and enqueues it
     * unless it is identical to what was last applied. `force` re-sends it
     * anyway, used after settings changes and taskbar recreation.
     */
    fn apply_appearance(&mut self, force: bool) {
        let (state, focused) = core::resolve_appearance(&self.settings, &self.last_snapshot, true);
        let (_, unfocused) = core::resolve_appearance(&self.settings, &self.last_snapshot, false);
        let command = PlatformCommand::ApplyTaskbarAppearance {
            state,
            focused,
            unfocused,
        };

        if !force && self.last_applied.as_ref() == Some(&command) {
            return;
        }
        log::debug!("TrayAppLogic: Applying appearance for {state:?}.");
        self.last_applied = Some(command.clone());
        self.enqueue(command);
    }

    fn apply_app_settings(&mut self) {
        self.enqueue(PlatformCommand::SetLogLevel(self.settings.verbosity));
        self.enqueue(PlatformCommand::SetTrayIconVisible(!self.settings.hide_tray));
        self.enqueue(PlatformCommand::SetIgnoredWindows(
            self.settings.ignored_windows.clone(),
        ));
    }

    fn refresh_flyout(&mut self) {
        let Some(flyout) = self.flyout.as_mut() else {
            return;
        };
        for state in TaskbarState::ALL {
            let (appearance, enabled) = self.settings.appearance(state);
            flyout.set_taskbar_settings(state, &appearance.active, enabled);
        }
        if let Some(environment) = &self.environment {
            flyout.set_taskbar_type(environment.taskbar_type);
        }
        flyout.set_log_level(self.settings.verbosity);
        flyout.set_disable_saving_settings(self.settings.disable_saving);
        flyout.set_startup_state(self.startup_state);
    }

    fn on_tray_started(
        &mut self,
        environment: EnvironmentInfo,
        startup_state: Option<StartupState>,
    ) {
        log::info!("TrayAppLogic: Tray started ({environment:?}).");
        self.environment = Some(environment);
        self.startup_state = startup_state;
        self.load_settings();

        self.flyout = Some(TrayFlyoutController::new(FlyoutOptions {
            has_package_identity: environment.has_package_identity,
            blur_supported: core::is_blur_supported(environment.os_build),
            system_has_battery: environment.system_has_battery,
        }));
        self.refresh_flyout();

        self.apply_app_settings();
        self.apply_appearance(true);
    }

    fn on_config_file_changed(&mut self) {
        let previous = self.settings.clone();
        if !self.load_settings() {
            // Keep running on whatever was in effect before the bad edit.
            self.settings = previous;
            return;
        }
        if self.settings == previous {
            log::trace!("TrayAppLogic: Settings file changed but contents are identical.");
            return;
        }
        log::info!("TrayAppLogic: Settings reloaded from disk.");
        self.apply_app_settings();
        self.apply_appearance(true);
    }

    fn on_tray_event(&mut self, event: TrayEvent) {
        log::debug!("TrayAppLogic: Handling tray event {event:?}.");
        match event {
            TrayEvent::TaskbarSettingsChanged { state, edit } => {
                edit.apply_to(self.settings.appearance_mut(state));
                if let Some(enabled) = edit.enabled {
                    self.settings.set_enabled(state, enabled);
                }
                self.save_settings(false);
                self.apply_appearance(true);
            }
            TrayEvent::ColorRequested(state) => {
                let initial = self.settings.appearance(state).0.active.color;
                self.enqueue(PlatformCommand::ShowColorPicker { state, initial });
            }
            TrayEvent::LogLevelChanged(level) => {
                self.settings.verbosity = level;
                self.save_settings(false);
                self.enqueue(PlatformCommand::SetLogLevel(level));
            }
            TrayEvent::OpenLogFile => match self.log_file_path.clone() {
                Some(path) => self.enqueue(PlatformCommand::OpenPath(path)),
                None => log::warn!("TrayAppLogic: No log file is being written."),
            },
            TrayEvent::EditSettings => {
                // Make sure the file reflects the current state before opening it.
                self.save_settings(true);
                match self.config_manager.config_file_path() {
                    Ok(path) => self.enqueue(PlatformCommand::OpenPath(path)),
                    Err(e) => log::error!("TrayAppLogic: Cannot open settings: {e}"),
                }
            }
            TrayEvent::ResetSettings => {
                log::info!("TrayAppLogic: Resetting settings to defaults.");
                self.settings = Settings::default();
                self.saving_blocked = false;
                self.save_settings(true);
                self.apply_app_settings();
                self.apply_appearance(true);
            }
            TrayEvent::DisableSavingSettingsChanged(disabled) => {
                self.settings.disable_saving = disabled;
                // The flag itself must reach the file.
                self.save_settings(true);
            }
            TrayEvent::HideTray => {
                self.settings.hide_tray = true;
                self.save_settings(false);
                self.enqueue(PlatformCommand::SetTrayIconVisible(false));
            }
            TrayEvent::DumpDynamicState => {
                self.dump_dynamic_state();
                self.enqueue(PlatformCommand::DumpDynamicState);
            }
            TrayEvent::ResetDynamicState => {
                self.last_applied = None;
                self.enqueue(PlatformCommand::ResetDynamicState);
                self.apply_appearance(true);
            }
            TrayEvent::StartupStateChanged => self.enqueue(PlatformCommand::ToggleStartupTask),
            TrayEvent::TipsAndTricks => self.enqueue(PlatformCommand::LaunchUri(
                ui_constants::TIPS_AND_TRICKS_URI.to_string(),
            )),
            TrayEvent::About => {
                self.enqueue(PlatformCommand::LaunchUri(ui_constants::ABOUT_URI.to_string()))
            }
            TrayEvent::Exit => self.enqueue(PlatformCommand::QuitApplication),
        }
    }

    fn dump_dynamic_state(&self) {
        let now = OffsetDateTime::now_utc()
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second] UTC"
            ))
            .unwrap_or_else(|_| "unknown time".to_string());
        log::info!("===== Dynamic state at {now} =====");
        log::info!("Environment: {:?}", self.environment);
        log::info!("Startup state: {:?}", self.startup_state);
        log::info!("Last snapshot: {:?}", self.last_snapshot);
        log::info!("Last applied: {:?}", self.last_applied);
        log::info!(
            "Saving: disabled={} blocked={}",
            self.settings.disable_saving,
            self.saving_blocked
        );
    }
}

impl PlatformEventHandler for TrayAppLogic {
    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::TrayStarted {
                environment,
                startup_state,
            } => self.on_tray_started(environment, startup_state),
            AppEvent::DesktopStateChanged { snapshot } => {
                self.last_snapshot = snapshot;
                self.apply_appearance(false);
            }
            AppEvent::TrayMenuRequested => {
                self.refresh_flyout();
                match self.flyout.as_ref().map(|flyout| flyout.items().to_vec()) {
                    Some(items) => self.enqueue(PlatformCommand::ShowTrayMenu { items }),
                    None => log::warn!("TrayAppLogic: Tray menu requested before startup."),
                }
            }
            AppEvent::TrayMenuItemClicked { item_id } => {
                let event = self.flyout.as_mut().and_then(|flyout| flyout.click(item_id));
                if let Some(event) = event {
                    self.on_tray_event(event);
                }
            }
            AppEvent::ColorPicked { state, color } => match color {
                Some(color) => {
                    self.settings.appearance_mut(state).color = color;
                    self.save_settings(false);
                    self.apply_appearance(true);
                }
                None => log::debug!("TrayAppLogic: Color selection for {state:?} cancelled."),
            },
            AppEvent::ConfigFileChanged => self.on_config_file_changed(),
            AppEvent::TaskbarCreated => {
                log::info!("TrayAppLogic: Taskbar recreated, reapplying.");
                self.enqueue(PlatformCommand::SetTrayIconVisible(!self.settings.hide_tray));
                self.last_applied = None;
                self.apply_appearance(true);
            }
            AppEvent::StartupStateReported { state } => {
                self.startup_state = state;
            }
        }
    }

    fn on_quit(&mut self) {
        log::debug!("TrayAppLogic: on_quit, saving settings.");
        self.save_settings(false);
    }

    fn try_dequeue_command(&mut self) -> Option<PlatformCommand> {
        self.command_queue.pop_front()
    }
}
