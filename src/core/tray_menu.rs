/*
 * The tray flyout as plain data. `TrayFlyoutController` owns a tree of
 * `MenuItem`s that the platform layer renders, reflects settings into the
 * checkable items, and translates clicks back into `TrayEvent`s.
 *
 * Items are identified by `MenuItemId` and classified by a `MenuTag`. The
 * appearance items of a taskbar state live directly in that state's submenu,
 * so the submenu's `MenuTag::State` tag is what ties a click back to the
 * state it edits.
 */
use super::appearance::{AccentState, TaskbarAppearance};
use super::settings::{LogLevel, TaskbarState, TaskbarType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuItemId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItemKind {
    Command,
    Toggle,
    Radio,
    SubMenu,
    Separator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrayCommand {
    OpenLogFile,
    EditSettings,
    ResetSettings,
    DisableSavingSettings,
    HideTray,
    DumpDynamicState,
    ResetDynamicState,
    Startup,
    TipsAndTricks,
    About,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTag {
    None,
    State(TaskbarState),
    Accent(AccentState),
    Enabled,
    ShowPeek,
    ShowLine,
    Color,
    LogLevel(LogLevel),
    Command(TrayCommand),
}

/// Mirrors the states a startup task can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    Disabled,
    DisabledByUser,
    Enabled,
    DisabledByPolicy,
    EnabledByPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub text: String,
    pub kind: MenuItemKind,
    pub tag: MenuTag,
    pub checked: bool,
    pub enabled: bool,
    pub visible: bool,
    pub children: Vec<MenuItem>,
}

/*
 * What the checkable items of one state submenu say. `enabled` is `None` for
 * a submenu without an "Enabled" toggle (the desktop).
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppearanceEdit {
    pub enabled: Option<bool>,
    pub accent: AccentState,
    pub show_peek: bool,
    pub show_line: bool,
}

impl AppearanceEdit {
    /// Color and blur radius are not edited from the menu and are kept.
    pub fn apply_to(&self, appearance: &mut TaskbarAppearance) {
        appearance.accent = self.accent;
        appearance.show_peek = self.show_peek;
        appearance.show_line = self.show_line;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrayEvent {
    TaskbarSettingsChanged {
        state: TaskbarState,
        edit: AppearanceEdit,
    },
    ColorRequested(TaskbarState),
    LogLevelChanged(LogLevel),
    OpenLogFile,
    EditSettings,
    ResetSettings,
    DisableSavingSettingsChanged(bool),
    HideTray,
    DumpDynamicState,
    ResetDynamicState,
    StartupStateChanged,
    TipsAndTricks,
    About,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlyoutOptions {
    pub has_package_identity: bool,
    pub blur_supported: bool,
    pub system_has_battery: bool,
}

pub struct TrayFlyoutController {
    items: Vec<MenuItem>,
    next_id: u32,
}

impl TrayFlyoutController {
    pub fn new(options: FlyoutOptions) -> Self {
        let mut controller = TrayFlyoutController {
            items: Vec::new(),
            next_id: 1,
        };
        controller.items = controller.build_layout(options);
        log::debug!(
            "TrayFlyoutController: Built flyout with {} top-level items ({:?}).",
            controller.items.len(),
            options
        );
        controller
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    fn item(&mut self, text: &str, kind: MenuItemKind, tag: MenuTag) -> MenuItem {
        let id = MenuItemId(self.next_id);
        self.next_id += 1;
        MenuItem {
            id,
            text: text.to_string(),
            kind,
            tag,
            checked: false,
            enabled: true,
            visible: true,
            children: Vec::new(),
        }
    }

    fn separator(&mut self) -> MenuItem {
        self.item("", MenuItemKind::Separator, MenuTag::None)
    }

    fn submenu(&mut self, text: &str, tag: MenuTag, children: Vec<MenuItem>) -> MenuItem {
        let mut submenu = self.item(text, MenuItemKind::SubMenu, tag);
        submenu.children = children;
        submenu
    }

    fn build_layout(&mut self, options: FlyoutOptions) -> Vec<MenuItem> {
        let mut items = Vec::new();

        for state in TaskbarState::ALL {
            if state == TaskbarState::BatterySaver && !options.system_has_battery {
                continue;
            }
            let children = self.build_state_items(state, options.blur_supported);
            let submenu = self.submenu(state.label(), MenuTag::State(state), children);
            items.push(submenu);
        }

        items.push(self.separator());

        let log_levels = LogLevel::ALL
            .into_iter()
            .map(|level| self.item(level.label(), MenuItemKind::Radio, MenuTag::LogLevel(level)))
            .collect();
        let log_submenu = self.submenu("Log verbosity", MenuTag::None, log_levels);

        let mut advanced = vec![log_submenu];
        let command = |c: &mut Self, text: &str, cmd: TrayCommand| {
            c.item(text, MenuItemKind::Command, MenuTag::Command(cmd))
        };
        advanced.push(command(self, "Open log file", TrayCommand::OpenLogFile));
        advanced.push(self.separator());
        advanced.push(command(self, "Edit settings", TrayCommand::EditSettings));
        advanced.push(command(self, "Reset settings", TrayCommand::ResetSettings));
        advanced.push(self.item(
            "Disable saving settings",
            MenuItemKind::Toggle,
            MenuTag::Command(TrayCommand::DisableSavingSettings),
        ));
        advanced.push(command(self, "Hide tray icon", TrayCommand::HideTray));
        advanced.push(self.separator());
        advanced.push(command(self, "Dump dynamic state", TrayCommand::DumpDynamicState));
        advanced.push(command(self, "Reset dynamic state", TrayCommand::ResetDynamicState));
        let advanced = self.submenu("Advanced", MenuTag::None, advanced);
        items.push(advanced);

        if options.has_package_identity {
            items.push(self.item(
                "Open at boot",
                MenuItemKind::Toggle,
                MenuTag::Command(TrayCommand::Startup),
            ));
        }

        items.push(self.separator());
        items.push(command(self, "Tips and tricks", TrayCommand::TipsAndTricks));
        items.push(command(self, "About", TrayCommand::About));
        items.push(command(self, "Exit", TrayCommand::Exit));
        items
    }

    fn build_state_items(&mut self, state: TaskbarState, blur_supported: bool) -> Vec<MenuItem> {
        let mut children = Vec::new();
        if state.can_be_disabled() {
            children.push(self.item("Enabled", MenuItemKind::Toggle, MenuTag::Enabled));
            children.push(self.separator());
        }
        for accent in AccentState::ALL {
            if accent == AccentState::Blur && !blur_supported {
                continue;
            }
            children.push(self.item(accent.label(), MenuItemKind::Radio, MenuTag::Accent(accent)));
        }
        children.push(self.separator());
        children.push(self.item("Color...", MenuItemKind::Command, MenuTag::Color));
        children.push(self.item("Show Aero Peek", MenuItemKind::Toggle, MenuTag::ShowPeek));
        children.push(self.item("Show line", MenuItemKind::Toggle, MenuTag::ShowLine));
        children
    }

    fn state_submenu_mut(&mut self, state: TaskbarState) -> Option<&mut MenuItem> {
        self.items
            .iter_mut()
            .find(|item| item.kind == MenuItemKind::SubMenu && item.tag == MenuTag::State(state))
    }

    fn state_submenu(&self, state: TaskbarState) -> Option<&MenuItem> {
        self.items
            .iter()
            .find(|item| item.kind == MenuItemKind::SubMenu && item.tag == MenuTag::State(state))
    }

    /*
     * Reflects one state's appearance into its submenu. With the state
     * disabled, everything but the "Enabled" toggle is greyed out; the color
     * item is also greyed out for the Normal accent, which has no color.
     */
    pub fn set_taskbar_settings(
        &mut self,
        state: TaskbarState,
        appearance: &TaskbarAppearance,
        enabled: Option<bool>,
    ) {
        let Some(submenu) = self.state_submenu_mut(state) else {
            log::trace!("TrayFlyoutController: No submenu for {state:?}, ignoring settings.");
            return;
        };

        let is_enabled = enabled.unwrap_or(true);
        for item in submenu.children.iter_mut() {
            match item.tag {
                MenuTag::Accent(accent) => {
                    item.checked = accent == appearance.accent;
                    item.enabled = is_enabled;
                }
                MenuTag::Enabled => item.checked = is_enabled,
                MenuTag::ShowPeek => {
                    item.checked = appearance.show_peek;
                    item.enabled = is_enabled;
                }
                MenuTag::ShowLine => {
                    item.checked = appearance.show_line;
                    item.enabled = is_enabled;
                }
                MenuTag::Color => {
                    item.enabled = is_enabled && appearance.accent != AccentState::Normal;
                }
                _ => {}
            }
        }
    }

    pub fn set_taskbar_type(&mut self, taskbar_type: TaskbarType) {
        for submenu in self.items.iter_mut() {
            if !matches!(submenu.tag, MenuTag::State(_)) {
                continue;
            }
            for item in submenu.children.iter_mut() {
                match item.tag {
                    MenuTag::ShowPeek => item.visible = taskbar_type == TaskbarType::Classic,
                    MenuTag::ShowLine => item.visible = taskbar_type == TaskbarType::Xaml,
                    _ => {}
                }
            }
        }
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        for_each_item_mut(&mut self.items, &mut |item| {
            if let MenuTag::LogLevel(tag) = item.tag {
                item.checked = tag == level;
            }
        });
    }

    pub fn set_disable_saving_settings(&mut self, disabled: bool) {
        self.set_command_checked(TrayCommand::DisableSavingSettings, disabled);
    }

    pub fn set_startup_state(&mut self, state: Option<StartupState>) {
        let (checked, enabled) = match state {
            Some(state) => (
                matches!(state, StartupState::Enabled | StartupState::EnabledByPolicy),
                matches!(
                    state,
                    StartupState::Disabled | StartupState::DisabledByUser | StartupState::Enabled
                ),
            ),
            None => (false, false),
        };
        for_each_item_mut(&mut self.items, &mut |item| {
            if item.tag == MenuTag::Command(TrayCommand::Startup) {
                item.checked = checked;
                item.enabled = enabled;
            }
        });
    }

    fn set_command_checked(&mut self, command: TrayCommand, checked: bool) {
        for_each_item_mut(&mut self.items, &mut |item| {
            if item.tag == MenuTag::Command(command) {
                item.checked = checked;
            }
        });
    }

    pub fn find(&self, id: MenuItemId) -> Option<&MenuItem> {
        find_in(&self.items, id)
    }

    /// The innermost submenu that directly contains `id`.
    pub fn get_item_parent(&self, id: MenuItemId) -> Option<&MenuItem> {
        containing_submenu(&self.items, id)
    }

    pub fn build_appearance_from_submenu(&self, state: TaskbarState) -> Option<AppearanceEdit> {
        let submenu = self.state_submenu(state)?;
        Some(edit_from_items(&submenu.children))
    }

    /*
     * Applies the click the way the native control would (toggles flip,
     * radios become the single checked radio of their submenu), then routes
     * it. Clicks on disabled, hidden or unknown items produce nothing.
     */
    pub fn click(&mut self, id: MenuItemId) -> Option<TrayEvent> {
        let (kind, tag) = match self.find(id) {
            Some(item) if item.enabled && item.visible => (item.kind, item.tag),
            Some(_) => {
                log::debug!("TrayFlyoutController: Ignoring click on inactive item {id:?}.");
                return None;
            }
            None => {
                log::warn!("TrayFlyoutController: Click on unknown item {id:?}.");
                return None;
            }
        };
        let parent_id = self.get_item_parent(id).map(|parent| parent.id);

        match kind {
            MenuItemKind::Toggle => {
                if let Some(item) = find_in_mut(&mut self.items, id) {
                    item.checked = !item.checked;
                }
            }
            MenuItemKind::Radio => {
                let siblings = match parent_id {
                    Some(parent) => find_in_mut(&mut self.items, parent).map(|p| &mut p.children),
                    None => Some(&mut self.items),
                };
                if let Some(siblings) = siblings {
                    for sibling in siblings.iter_mut() {
                        if sibling.kind == MenuItemKind::Radio {
                            sibling.checked = sibling.id == id;
                        }
                    }
                }
            }
            _ => {}
        }

        let parent_state = parent_id
            .and_then(|parent| self.find(parent))
            .and_then(|parent| match parent.tag {
                MenuTag::State(state) => Some(state),
                _ => None,
            });

        match tag {
            MenuTag::Accent(_) | MenuTag::Enabled | MenuTag::ShowPeek | MenuTag::ShowLine => {
                let state = parent_state?;
                let edit = self.build_appearance_from_submenu(state)?;
                Some(TrayEvent::TaskbarSettingsChanged { state, edit })
            }
            MenuTag::Color => parent_state.map(TrayEvent::ColorRequested),
            MenuTag::LogLevel(level) => Some(TrayEvent::LogLevelChanged(level)),
            MenuTag::Command(command) => Some(match command {
                TrayCommand::OpenLogFile => TrayEvent::OpenLogFile,
                TrayCommand::EditSettings => TrayEvent::EditSettings,
                TrayCommand::ResetSettings => TrayEvent::ResetSettings,
                TrayCommand::DisableSavingSettings => {
                    let checked = self.find(id).map(|item| item.checked).unwrap_or(false);
                    TrayEvent::DisableSavingSettingsChanged(checked)
                }
                TrayCommand::HideTray => TrayEvent::HideTray,
                TrayCommand::DumpDynamicState => TrayEvent::DumpDynamicState,
                TrayCommand::ResetDynamicState => TrayEvent::ResetDynamicState,
                TrayCommand::Startup => TrayEvent::StartupStateChanged,
                TrayCommand::TipsAndTricks => TrayEvent::TipsAndTricks,
                TrayCommand::About => TrayEvent::About,
                TrayCommand::Exit => TrayEvent::Exit,
            }),
            MenuTag::State(_) | MenuTag::None => None,
        }
    }
}

fn edit_from_items(items: &[MenuItem]) -> AppearanceEdit {
    let mut edit = AppearanceEdit {
        enabled: None,
        accent: AccentState::Normal,
        show_peek: true,
        show_line: true,
    };
    for item in items {
        match item.tag {
            MenuTag::Enabled if item.kind == MenuItemKind::Toggle => edit.enabled = Some(item.checked),
            MenuTag::Accent(accent) if item.checked => edit.accent = accent,
            MenuTag::ShowPeek => edit.show_peek = item.checked,
            MenuTag::ShowLine => edit.show_line = item.checked,
            _ => {}
        }
    }
    edit
}

fn for_each_item_mut(items: &mut [MenuItem], f: &mut dyn FnMut(&mut MenuItem)) {
    for item in items.iter_mut() {
        f(item);
        for_each_item_mut(&mut item.children, f);
    }
}

fn find_in(items: &[MenuItem], id: MenuItemId) -> Option<&MenuItem> {
    for item in items {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = find_in(&item.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut(items: &mut [MenuItem], id: MenuItemId) -> Option<&mut MenuItem> {
    for item in items.iter_mut() {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = find_in_mut(&mut item.children, id) {
            return Some(found);
        }
    }
    None
}

fn containing_submenu(items: &[MenuItem], id: MenuItemId) -> Option<&MenuItem> {
    for item in items.iter().filter(|item| item.kind == MenuItemKind::SubMenu) {
        if item.children.iter().any(|child| child.id == id) {
            return Some(item);
        }
        if let Some(parent) = containing_submenu(&item.children, id) {
            return Some(parent);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::color::Color;

    fn full_options() -> FlyoutOptions {
        FlyoutOptions {
            has_package_identity: true,
            blur_supported: true,
            system_has_battery: true,
        }
    }

    fn find_tag(
        controller: &TrayFlyoutController,
        state: TaskbarState,
        tag: MenuTag,
    ) -> MenuItem {
        controller
            .state_submenu(state)
            .and_then(|submenu| submenu.children.iter().find(|item| item.tag == tag))
            .cloned()
            .unwrap_or_else(|| panic!("no {tag:?} in {state:?}"))
    }

    fn find_anywhere(controller: &TrayFlyoutController, tag: MenuTag) -> Option<MenuItem> {
        fn walk(items: &[MenuItem], tag: MenuTag) -> Option<MenuItem> {
            for item in items {
                if item.tag == tag {
                    return Some(item.clone());
                }
                if let Some(found) = walk(&item.children, tag) {
                    return Some(found);
                }
            }
            None
        }
        walk(controller.items(), tag)
    }

    #[test]
    fn test_layout_has_a_submenu_per_state_and_unique_ids() {
        let controller = TrayFlyoutController::new(full_options());
        for state in TaskbarState::ALL {
            assert!(controller.state_submenu(state).is_some(), "{state:?}");
        }

        let mut ids = Vec::new();
        fn collect(items: &[MenuItem], ids: &mut Vec<MenuItemId>) {
            for item in items {
                ids.push(item.id);
                collect(&item.children, ids);
            }
        }
        collect(controller.items(), &mut ids);
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn test_layout_respects_options() {
        let controller = TrayFlyoutController::new(FlyoutOptions {
            has_package_identity: false,
            blur_supported: false,
            system_has_battery: false,
        });
        assert!(controller.state_submenu(TaskbarState::BatterySaver).is_none());
        assert!(find_anywhere(&controller, MenuTag::Command(TrayCommand::Startup)).is_none());
        assert!(find_anywhere(&controller, MenuTag::Accent(AccentState::Blur)).is_none());
        assert!(find_anywhere(&controller, MenuTag::Accent(AccentState::Acrylic)).is_some());
    }

    #[test]
    fn test_desktop_submenu_has_no_enabled_toggle() {
        let controller = TrayFlyoutController::new(full_options());
        let desktop = controller.state_submenu(TaskbarState::Desktop).unwrap();
        assert!(desktop.children.iter().all(|item| item.tag != MenuTag::Enabled));
        let start = controller.state_submenu(TaskbarState::StartOpened).unwrap();
        assert!(start.children.iter().any(|item| item.tag == MenuTag::Enabled));
    }

    #[test]
    fn test_set_taskbar_settings_reflects_appearance() {
        let mut controller = TrayFlyoutController::new(full_options());
        let appearance = TaskbarAppearance::new(
            AccentState::Acrylic,
            Color::new(1, 2, 3, 4),
            false,
            true,
            9.0,
        );

        controller.set_taskbar_settings(TaskbarState::VisibleWindow, &appearance, Some(true));

        let state = TaskbarState::VisibleWindow;
        assert!(find_tag(&controller, state, MenuTag::Accent(AccentState::Acrylic)).checked);
        assert!(!find_tag(&controller, state, MenuTag::Accent(AccentState::Clear)).checked);
        assert!(find_tag(&controller, state, MenuTag::Enabled).checked);
        assert!(!find_tag(&controller, state, MenuTag::ShowPeek).checked);
        assert!(find_tag(&controller, state, MenuTag::ShowLine).checked);
        assert!(find_tag(&controller, state, MenuTag::Color).enabled);
    }

    #[test]
    fn test_disabled_state_greys_out_everything_but_enabled_toggle() {
        let mut controller = TrayFlyoutController::new(full_options());
        let appearance = TaskbarAppearance::with_accent(AccentState::Blur);
        let state = TaskbarState::SearchOpened;

        controller.set_taskbar_settings(state, &appearance, Some(false));

        let enabled_toggle = find_tag(&controller, state, MenuTag::Enabled);
        assert!(!enabled_toggle.checked);
        assert!(enabled_toggle.enabled);
        assert!(!find_tag(&controller, state, MenuTag::Accent(AccentState::Blur)).enabled);
        assert!(!find_tag(&controller, state, MenuTag::ShowPeek).enabled);
        assert!(!find_tag(&controller, state, MenuTag::ShowLine).enabled);
        assert!(!find_tag(&controller, state, MenuTag::Color).enabled);
    }

    #[test]
    fn test_color_item_disabled_for_normal_accent() {
        let mut controller = TrayFlyoutController::new(full_options());
        controller.set_taskbar_settings(
            TaskbarState::Desktop,
            &TaskbarAppearance::with_accent(AccentState::Normal),
            None,
        );
        assert!(!find_tag(&controller, TaskbarState::Desktop, MenuTag::Color).enabled);
        assert!(
            find_tag(
                &controller,
                TaskbarState::Desktop,
                MenuTag::Accent(AccentState::Normal)
            )
            .enabled
        );
    }

    #[test]
    fn test_set_taskbar_type_toggles_peek_and_line_visibility() {
        let mut controller = TrayFlyoutController::new(full_options());

        controller.set_taskbar_type(TaskbarType::Classic);
        for state in TaskbarState::ALL {
            assert!(find_tag(&controller, state, MenuTag::ShowPeek).visible);
            assert!(!find_tag(&controller, state, MenuTag::ShowLine).visible);
        }

        controller.set_taskbar_type(TaskbarType::Xaml);
        for state in TaskbarState::ALL {
            assert!(!find_tag(&controller, state, MenuTag::ShowPeek).visible);
            assert!(find_tag(&controller, state, MenuTag::ShowLine).visible);
        }
    }

    #[test]
    fn test_startup_state_mapping() {
        let mut controller = TrayFlyoutController::new(full_options());
        let startup = |c: &TrayFlyoutController| {
            let item = find_anywhere(c, MenuTag::Command(TrayCommand::Startup)).unwrap();
            (item.checked, item.enabled)
        };

        let expectations = [
            (Some(StartupState::Enabled), (true, true)),
            (Some(StartupState::EnabledByPolicy), (true, false)),
            (Some(StartupState::Disabled), (false, true)),
            (Some(StartupState::DisabledByUser), (false, true)),
            (Some(StartupState::DisabledByPolicy), (false, false)),
            (None, (false, false)),
        ];
        for (state, expected) in expectations {
            controller.set_startup_state(state);
            assert_eq!(startup(&controller), expected, "{state:?}");
        }
    }

    #[test]
    fn test_get_item_parent_finds_nested_submenu() {
        let controller = TrayFlyoutController::new(full_options());
        let debug = find_anywhere(&controller, MenuTag::LogLevel(LogLevel::Debug)).unwrap();
        let parent = controller.get_item_parent(debug.id).unwrap();
        assert_eq!(parent.text, "Log verbosity");

        let peek = find_tag(&controller, TaskbarState::MaximisedWindow, MenuTag::ShowPeek);
        let parent = controller.get_item_parent(peek.id).unwrap();
        assert_eq!(parent.tag, MenuTag::State(TaskbarState::MaximisedWindow));

        let exit = find_anywhere(&controller, MenuTag::Command(TrayCommand::Exit)).unwrap();
        assert!(controller.get_item_parent(exit.id).is_none());
    }

    #[test]
    fn test_clicking_accent_radio_builds_edit_for_that_state() {
        let mut controller = TrayFlyoutController::new(full_options());
        let state = TaskbarState::MaximisedWindow;
        controller.set_taskbar_settings(
            state,
            &TaskbarAppearance::with_accent(AccentState::Acrylic),
            Some(true),
        );
        let opaque = find_tag(&controller, state, MenuTag::Accent(AccentState::Opaque));

        let event = controller.click(opaque.id);

        assert_eq!(
            event,
            Some(TrayEvent::TaskbarSettingsChanged {
                state,
                edit: AppearanceEdit {
                    enabled: Some(true),
                    accent: AccentState::Opaque,
                    show_peek: true,
                    show_line: true,
                },
            })
        );
        assert!(!find_tag(&controller, state, MenuTag::Accent(AccentState::Acrylic)).checked);
        // Other submenus are untouched.
        assert!(!find_tag(&controller, TaskbarState::Desktop, MenuTag::Accent(AccentState::Opaque)).checked);
    }

    #[test]
    fn test_clicking_toggles_flips_them() {
        let mut controller = TrayFlyoutController::new(full_options());
        let state = TaskbarState::StartOpened;
        controller.set_taskbar_settings(
            state,
            &TaskbarAppearance::with_accent(AccentState::Clear),
            Some(false),
        );

        let enabled = find_tag(&controller, state, MenuTag::Enabled);
        match controller.click(enabled.id) {
            Some(TrayEvent::TaskbarSettingsChanged { state: s, edit }) => {
                assert_eq!(s, state);
                assert_eq!(edit.enabled, Some(true));
                assert_eq!(edit.accent, AccentState::Clear);
            }
            other => panic!("unexpected event {other:?}"),
        }

        controller.set_taskbar_settings(
            TaskbarState::Desktop,
            &TaskbarAppearance::default(),
            None,
        );
        let desktop_line = find_tag(&controller, TaskbarState::Desktop, MenuTag::ShowLine);
        match controller.click(desktop_line.id) {
            Some(TrayEvent::TaskbarSettingsChanged { edit, .. }) => {
                assert_eq!(edit.enabled, None);
                assert!(!edit.show_line);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_clicking_disabled_item_does_nothing() {
        let mut controller = TrayFlyoutController::new(full_options());
        let state = TaskbarState::SearchOpened;
        controller.set_taskbar_settings(state, &TaskbarAppearance::default(), Some(false));
        let peek = find_tag(&controller, state, MenuTag::ShowPeek);

        assert_eq!(controller.click(peek.id), None);
        assert_eq!(find_tag(&controller, state, MenuTag::ShowPeek).checked, peek.checked);
        assert_eq!(controller.click(MenuItemId(9999)), None);
    }

    #[test]
    fn test_command_routing() {
        let mut controller = TrayFlyoutController::new(full_options());
        let color = find_tag(&controller, TaskbarState::BatterySaver, MenuTag::Color);
        assert_eq!(
            controller.click(color.id),
            Some(TrayEvent::ColorRequested(TaskbarState::BatterySaver))
        );

        let trace = find_anywhere(&controller, MenuTag::LogLevel(LogLevel::Trace)).unwrap();
        assert_eq!(
            controller.click(trace.id),
            Some(TrayEvent::LogLevelChanged(LogLevel::Trace))
        );
        assert!(find_anywhere(&controller, MenuTag::LogLevel(LogLevel::Trace)).unwrap().checked);

        let saving =
            find_anywhere(&controller, MenuTag::Command(TrayCommand::DisableSavingSettings))
                .unwrap();
        assert_eq!(
            controller.click(saving.id),
            Some(TrayEvent::DisableSavingSettingsChanged(true))
        );
        assert_eq!(
            controller.click(saving.id),
            Some(TrayEvent::DisableSavingSettingsChanged(false))
        );

        let exit = find_anywhere(&controller, MenuTag::Command(TrayCommand::Exit)).unwrap();
        assert_eq!(controller.click(exit.id), Some(TrayEvent::Exit));
    }

    #[test]
    fn test_set_log_level_checks_exactly_one() {
        let mut controller = TrayFlyoutController::new(full_options());
        controller.set_log_level(LogLevel::Info);
        for level in LogLevel::ALL {
            let item = find_anywhere(&controller, MenuTag::LogLevel(level)).unwrap();
            assert_eq!(item.checked, level == LogLevel::Info);
        }
    }

    #[test]
    fn test_appearance_edit_keeps_color_and_radius() {
        let mut appearance =
            TaskbarAppearance::new(AccentState::Clear, Color::new(9, 9, 9, 9), true, true, 4.0);
        AppearanceEdit {
            enabled: Some(true),
            accent: AccentState::Acrylic,
            show_peek: false,
            show_line: false,
        }
        .apply_to(&mut appearance);
        assert_eq!(appearance.accent, AccentState::Acrylic);
        assert_eq!(appearance.color, Color::new(9, 9, 9, 9));
        assert_eq!(appearance.blur_radius, 4.0);
        assert!(!appearance.show_peek && !appearance.show_line);
    }
}
