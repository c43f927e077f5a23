/*
 * Decides which top-level windows count as "user windows" when the desktop
 * state is computed, and which of them the user asked to ignore. The native
 * side gathers `WindowTraits` and `WindowInfo`; everything here is plain
 * logic over those values.
 */
use super::settings::IgnoredWindows;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowTraits {
    pub valid: bool,
    pub visible: bool,
    pub cloaked: bool,
    /// The window is its own root ancestor (a top-level window).
    pub is_root: bool,
    pub tool_window: bool,
    pub no_activate: bool,
    pub app_window: bool,
    /// `None` when the virtual desktop manager could not answer.
    pub on_current_desktop: Option<bool>,
}

/*
 * A window is a user window when it is valid, visible, not cloaked, not a
 * tool window (tool windows count as invisible), top-level, activatable (or
 * explicitly flagged as an app window), and on the current virtual desktop.
 * Unknown desktop membership counts as "not on it".
 */
pub fn is_user_window(traits: &WindowTraits) -> bool {
    if !traits.valid || traits.tool_window || !traits.visible || traits.cloaked {
        return false;
    }
    if !traits.is_root {
        return false;
    }
    (!traits.no_activate || traits.app_window) && traits.on_current_desktop.unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowInfo {
    pub class_name: Option<String>,
    pub title: Option<String>,
    pub file: Option<PathBuf>,
}

impl IgnoredWindows {
    /*
     * Class names compare exactly, titles by substring, and process names
     * against the image's file name, ignoring case.
     */
    pub fn matches(&self, info: &WindowInfo) -> bool {
        if let Some(class_name) = &info.class_name {
            if self.window_class.iter().any(|c| c == class_name) {
                return true;
            }
        }

        if let Some(title) = &info.title {
            if self
                .window_title
                .iter()
                .any(|t| !t.is_empty() && title.contains(t.as_str()))
            {
                return true;
            }
        }

        if let Some(file_name) = info.file.as_deref().and_then(file_name_of) {
            if self
                .process_name
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&file_name))
            {
                return true;
            }
        }

        false
    }
}

/// Windows image paths use backslashes; handle them on every host.
fn file_name_of(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    text.rsplit(['\\', '/'])
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
