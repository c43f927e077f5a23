/*
 * Plain data describing how a taskbar should look: the accent treatment, its
 * tint color, blur radius, and whether the peek button and separator line are
 * shown. `ActiveInactiveTaskbarAppearance` adds an optional variant for
 * taskbars on monitors without the foreground window, and
 * `OptionalTaskbarAppearance` adds an enabled flag for the desktop states
 * that can be switched off.
 *
 * The JSON form is flat: the inactive variant nests under `inactive` and the
 * enabled flag sits next to the appearance keys. Unknown keys never fail a
 * load; `scan_unknown_keys` reports them by dotted path instead.
 */
use super::color::Color;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// First Windows build where blur on the taskbar is no longer offered.
pub const BLUR_UNSUPPORTED_FROM_BUILD: u32 = 22000;

const APPEARANCE_KEYS: &[&str] = &["accent", "color", "show_peek", "show_line", "blur_radius"];
const INACTIVE_KEY: &str = "inactive";
const ENABLED_KEY: &str = "enabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccentState {
    #[default]
    Normal,
    Opaque,
    Clear,
    Blur,
    Acrylic,
}

impl AccentState {
    pub const ALL: [AccentState; 5] = [
        AccentState::Normal,
        AccentState::Opaque,
        AccentState::Clear,
        AccentState::Blur,
        AccentState::Acrylic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AccentState::Normal => "Normal",
            AccentState::Opaque => "Opaque",
            AccentState::Clear => "Clear",
            AccentState::Blur => "Blur",
            AccentState::Acrylic => "Acrylic",
        }
    }
}

pub fn is_blur_supported(os_build: u32) -> bool {
    os_build < BLUR_UNSUPPORTED_FROM_BUILD
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskbarAppearance {
    pub accent: AccentState,
    pub color: Color,
    pub show_peek: bool,
    pub show_line: bool,
    pub blur_radius: f32,
}

impl Default for TaskbarAppearance {
    fn default() -> Self {
        TaskbarAppearance {
            accent: AccentState::Normal,
            color: Color::new(0, 0, 0, 0),
            show_peek: true,
            show_line: true,
            blur_radius: 9.0,
        }
    }
}

impl TaskbarAppearance {
    pub fn new(
        accent: AccentState,
        color: Color,
        show_peek: bool,
        show_line: bool,
        blur_radius: f32,
    ) -> Self {
        TaskbarAppearance {
            accent,
            color,
            show_peek,
            show_line,
            blur_radius,
        }
    }

    pub fn with_accent(accent: AccentState) -> Self {
        TaskbarAppearance {
            accent,
            ..Default::default()
        }
    }

    pub fn scan_unknown_keys(value: &Value, path: &str, report: &mut dyn FnMut(String)) {
        scan_object(value, path, APPEARANCE_KEYS, report);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ActiveInactiveTaskbarAppearance {
    #[serde(flatten)]
    pub active: TaskbarAppearance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive: Option<TaskbarAppearance>,
}

impl ActiveInactiveTaskbarAppearance {
    pub fn new(active: TaskbarAppearance, inactive: Option<TaskbarAppearance>) -> Self {
        ActiveInactiveTaskbarAppearance { active, inactive }
    }

    /*
     * Picks the variant for a taskbar. A taskbar on the monitor holding the
     * foreground window is "focused"; the others use the inactive variant if
     * one is configured.
     */
    pub fn for_focus(&self, focused: bool) -> &TaskbarAppearance {
        match (&self.inactive, focused) {
            (Some(inactive), false) => inactive,
            _ => &self.active,
        }
    }

    pub fn scan_unknown_keys(value: &Value, path: &str, report: &mut dyn FnMut(String)) {
        scan_object(value, path, &known_with(&[INACTIVE_KEY]), report);
        if let Some(inactive) = value.get(INACTIVE_KEY) {
            TaskbarAppearance::scan_unknown_keys(inactive, &join(path, INACTIVE_KEY), report);
        }
    }
}

impl From<TaskbarAppearance> for ActiveInactiveTaskbarAppearance {
    fn from(active: TaskbarAppearance) -> Self {
        ActiveInactiveTaskbarAppearance {
            active,
            inactive: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OptionalTaskbarAppearance {
    pub enabled: bool,
    #[serde(flatten)]
    pub appearance: ActiveInactiveTaskbarAppearance,
}

impl OptionalTaskbarAppearance {
    pub fn new(enabled: bool, appearance: TaskbarAppearance) -> Self {
        OptionalTaskbarAppearance {
            enabled,
            appearance: appearance.into(),
        }
    }

    pub fn scan_unknown_keys(value: &Value, path: &str, report: &mut dyn FnMut(String)) {
        scan_object(value, path, &known_with(&[INACTIVE_KEY, ENABLED_KEY]), report);
        if let Some(inactive) = value.get(INACTIVE_KEY) {
            TaskbarAppearance::scan_unknown_keys(inactive, &join(path, INACTIVE_KEY), report);
        }
    }
}

fn known_with(extra: &[&'static str]) -> Vec<&'static str> {
    APPEARANCE_KEYS.iter().chain(extra.iter()).copied().collect()
}

pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/*
 * Reports every member of `value` whose name is not in `known`. Non-object
 * values are left alone; type mismatches are the deserializer's concern.
 */
pub(crate) fn scan_object(
    value: &Value,
    path: &str,
    known: &[&str],
    report: &mut dyn FnMut(String),
) {
    if let Value::Object(map) = value {
        for key in map.keys() {
            if !known.contains(&key.as_str()) {
                report(join(path, key));
            }
        }
    }
}
