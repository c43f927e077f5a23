/*
 * Everything that touches the taskbars themselves: finding them, pushing an
 * accent policy through the undocumented `SetWindowCompositionAttribute`,
 * the Aero Peek button, plus the machine facts and the desktop polling that
 * decide which appearance applies.
 */
use super::window::Window;
use crate::core::{
    AccentState, DesktopSnapshot, IgnoredWindows, TaskbarAppearance, TaskbarType, shell_state_of,
    system_has_battery,
};

use windows::{
    Win32::{
        Foundation::{HWND, LPARAM, NTSTATUS},
        Graphics::Gdi::{HMONITOR, MONITOR_DEFAULTTONEAREST, MonitorFromWindow},
        System::{
            LibraryLoader::{GetModuleHandleW, GetProcAddress},
            Power::{GetSystemPowerStatus, SYSTEM_POWER_STATUS},
            SystemInformation::OSVERSIONINFOW,
            Threading::GetCurrentProcessId,
        },
        UI::WindowsAndMessaging::{EnumWindows, FindWindowExW, FindWindowW, SW_HIDE, SW_SHOWNA, ShowWindow},
    },
    core::{BOOL, s, w},
};

use std::ffi::c_void;
use std::sync::OnceLock;

const WCA_ACCENT_POLICY: u32 = 19;

const ACCENT_DISABLED: u32 = 0;
const ACCENT_ENABLE_GRADIENT: u32 = 1;
const ACCENT_ENABLE_TRANSPARENTGRADIENT: u32 = 2;
const ACCENT_ENABLE_BLURBEHIND: u32 = 3;
const ACCENT_ENABLE_ACRYLICBLURBEHIND: u32 = 4;
// Makes the compositor use `gradient_color`.
const ACCENT_FLAG_USE_COLOR: u32 = 2;


#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AccentPolicy {
    accent_state: u32,
    accent_flags: u32,
    gradient_color: u32,
    animation_id: u32,
}

#[repr(C)]
struct WindowCompositionAttribData {
    attribute: u32,
    data: *mut c_void,
    size: usize,
}

type SetWindowCompositionAttributeFn =
    unsafe extern "system" fn(HWND, *mut WindowCompositionAttribData) -> BOOL;
type RtlGetVersionFn = unsafe extern "system" fn(*mut OSVERSIONINFOW) -> NTSTATUS;

fn set_window_composition_attribute() -> Option<SetWindowCompositionAttributeFn> {
    static FUNCTION: OnceLock<Option<SetWindowCompositionAttributeFn>> = OnceLock::new();
    *FUNCTION.get_or_init(|| unsafe {
        let user32 = GetModuleHandleW(w!("user32.dll")).ok()?;
        let address = GetProcAddress(user32, s!("SetWindowCompositionAttribute"));
        if address.is_none() {
            log::error!("Taskbar: SetWindowCompositionAttribute is not available.");
        }
        Some(std::mem::transmute::<
            unsafe extern "system" fn() -> isize,
            SetWindowCompositionAttributeFn,
        >(address?))
    })
}

pub(crate) fn accent_policy(appearance: &TaskbarAppearance) -> AccentPolicy {
    let accent_state = match appearance.accent {
        AccentState::Normal => ACCENT_DISABLED,
        AccentState::Opaque => ACCENT_ENABLE_GRADIENT,
        AccentState::Clear => ACCENT_ENABLE_TRANSPARENTGRADIENT,
        AccentState::Blur => ACCENT_ENABLE_BLURBEHIND,
        AccentState::Acrylic => ACCENT_ENABLE_ACRYLICBLURBEHIND,
    };

    let mut color = appearance.color;
    // Acrylic with a fully transparent tint renders solid black.
    if appearance.accent == AccentState::Acrylic && color.a == 0 {
        color.a = 1;
    }

    AccentPolicy {
        accent_state,
        accent_flags: if accent_state == ACCENT_DISABLED {
            0
        } else {
            ACCENT_FLAG_USE_COLOR
        },
        gradient_color: color.to_abgr(),
        animation_id: 0,
    }
}

fn set_accent(window: Window, mut policy: AccentPolicy) -> bool {
    let Some(set_attribute) = set_window_composition_attribute() else {
        return false;
    };
    let mut data = WindowCompositionAttribData {
        attribute: WCA_ACCENT_POLICY,
        data: &mut policy as *mut AccentPolicy as *mut c_void,
        size: std::mem::size_of::<AccentPolicy>(),
    };
    let applied = unsafe { set_attribute(window.handle(), &mut data) }.as_bool();
    if !applied {
        log::info!("Taskbar: Setting accent on {:?} failed.", window.handle());
    }
    applied
}

/// The build number, read without the compatibility shims of `GetVersionEx`.
pub fn os_build() -> u32 {
    static BUILD: OnceLock<u32> = OnceLock::new();
    *BUILD.get_or_init(|| {
        let rtl_get_version = unsafe {
            GetModuleHandleW(w!("ntdll.dll"))
                .ok()
                .and_then(|ntdll| GetProcAddress(ntdll, s!("RtlGetVersion")))
                .map(|address| {
                    std::mem::transmute::<unsafe extern "system" fn() -> isize, RtlGetVersionFn>(
                        address,
                    )
                })
        };
        let Some(rtl_get_version) = rtl_get_version else {
            log::error!("Taskbar: RtlGetVersion is not available.");
            return 0;
        };

        let mut info = OSVERSIONINFOW {
            dwOSVersionInfoSize: std::mem::size_of::<OSVERSIONINFOW>() as u32,
            ..Default::default()
        };
        let status = unsafe { rtl_get_version(&mut info) };
        if status.0 < 0 {
            log::error!("Taskbar: RtlGetVersion failed: {status:?}");
            return 0;
        }
        log::info!(
            "Taskbar: Running on Windows {}.{}.{}",
            info.dwMajorVersion,
            info.dwMinorVersion,
            info.dwBuildNumber
        );
        info.dwBuildNumber
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerStatus {
    pub has_battery: bool,
    pub battery_saver: bool,
}

pub fn power_status() -> PowerStatus {
    let mut status = SYSTEM_POWER_STATUS::default();
    match unsafe { GetSystemPowerStatus(&mut status) } {
        Ok(()) => PowerStatus {
            has_battery: system_has_battery(Some(status.BatteryFlag)),
            battery_saver: status.SystemStatusFlag == 1,
        },
        Err(e) => {
            log::warn!("Taskbar: GetSystemPowerStatus failed: {e}");
            PowerStatus {
                has_battery: system_has_battery(None),
                battery_saver: false,
            }
        }
    }
}

/// The taskbar windows, primary first.
#[derive(Debug, Default)]
pub struct Taskbars {
    windows: Vec<Window>,
}

impl Taskbars {
    pub fn find() -> Self {
        let mut windows = Vec::new();
        match unsafe { FindWindowW(w!("Shell_TrayWnd"), None) } {
            Ok(primary) => windows.push(Window(primary)),
            Err(e) => log::warn!("Taskbar: Primary taskbar not found: {e}"),
        }

        let mut after: Option<HWND> = None;
        while let Ok(secondary) =
            unsafe { FindWindowExW(None, after, w!("Shell_SecondaryTrayWnd"), None) }
        {
            windows.push(Window(secondary));
            after = Some(secondary);
        }

        log::debug!("Taskbar: Found {} taskbar(s).", windows.len());
        Taskbars { windows }
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /*
     * Applies `focused` to the taskbar on the monitor holding the foreground
     * window and `unfocused` everywhere else. Returns false when a taskbar
     * handle went stale, which means Explorer is restarting.
     */
    pub fn apply(
        &self,
        focused_monitor: Option<HMONITOR>,
        focused: &TaskbarAppearance,
        unfocused: &TaskbarAppearance,
        taskbar_type: TaskbarType,
    ) -> bool {
        let mut all_valid = true;
        for (index, taskbar) in self.windows.iter().enumerate() {
            if !taskbar.valid() {
                all_valid = false;
                continue;
            }
            let monitor = unsafe { MonitorFromWindow(taskbar.handle(), MONITOR_DEFAULTTONEAREST) };
            let appearance = if Some(monitor) == focused_monitor {
                focused
            } else {
                unfocused
            };
            set_accent(*taskbar, accent_policy(appearance));
            if index == 0 && taskbar_type == TaskbarType::Classic {
                set_peek_visible(*taskbar, appearance.show_peek);
            }
        }
        all_valid
    }

    /// Hands every taskbar back to the system's own appearance.
    pub fn restore(&self) {
        let normal = TaskbarAppearance::with_accent(AccentState::Normal);
        for taskbar in self.windows.iter().filter(|t| t.valid()) {
            set_accent(*taskbar, accent_policy(&normal));
        }
        if let Some(primary) = self.windows.first() {
            set_peek_visible(*primary, true);
        }
    }
}

fn set_peek_visible(taskbar: Window, visible: bool) {
    let button = unsafe {
        FindWindowExW(Some(taskbar.handle()), None, w!("TrayNotifyWnd"), None).and_then(
            |notify| FindWindowExW(Some(notify), None, w!("TrayShowDesktopButtonWClass"), None),
        )
    };
    match button {
        Ok(button) => {
            let _ = unsafe { ShowWindow(button, if visible { SW_SHOWNA } else { SW_HIDE }) };
        }
        Err(e) => log::debug!("Taskbar: Peek button not found: {e}"),
    }
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let windows = unsafe { &mut *(lparam.0 as *mut Vec<Window>) };
    windows.push(Window(hwnd));
    BOOL(1)
}

fn top_level_windows() -> Vec<Window> {
    let mut windows: Vec<Window> = Vec::new();
    let result = unsafe {
        EnumWindows(
            Some(collect_window),
            LPARAM(&mut windows as *mut Vec<Window> as isize),
        )
    };
    if let Err(e) = result {
        log::warn!("Taskbar: EnumWindows failed: {e}");
    }
    windows
}

/*
 * Builds a `DesktopSnapshot` from the current desktop. Our own windows and
 * the ones the user ignores never count as visible or maximised.
 */
pub struct DesktopPoller {
    ignored: IgnoredWindows,
    own_process: u32,
}

impl Default for DesktopPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopPoller {
    pub fn new() -> Self {
        DesktopPoller {
            ignored: IgnoredWindows::default(),
            own_process: unsafe { GetCurrentProcessId() },
        }
    }

    pub fn set_ignored(&mut self, ignored: IgnoredWindows) {
        self.ignored = ignored;
    }

    pub fn focused_monitor() -> Option<HMONITOR> {
        Window::foreground()
            .map(|window| unsafe { MonitorFromWindow(window.handle(), MONITOR_DEFAULTTONEAREST) })
    }

    pub fn poll(&self) -> DesktopSnapshot {
        let mut snapshot = DesktopSnapshot::default();

        if let Some(foreground) = Window::foreground() {
            if let Some(state) = shell_state_of(&foreground.info()) {
                snapshot.mark_shell_state(state);
            }
        }

        for window in top_level_windows() {
            if snapshot.visible_window && snapshot.maximised_window {
                break;
            }
            if window.process_id() == self.own_process || !window.is_user_window() {
                continue;
            }
            if !self.ignored.is_empty() && self.ignored.matches(&window.info()) {
                continue;
            }
            snapshot.visible_window = true;
            if window.maximised() {
                snapshot.maximised_window = true;
            }
        }

        snapshot.battery_saver = power_status().battery_saver;
        snapshot
    }
}
