use super::error::{PlatformError, Result as PlatformResult};
use crate::core::{self, WindowInfo, WindowTraits};

use windows::{
    Win32::{
        Foundation::{
            CloseHandle, ERROR_SUCCESS, GetLastError, HWND, LPARAM, NTSTATUS, SetLastError,
            UNICODE_STRING, WIN32_ERROR, WPARAM,
        },
        Graphics::Dwm::{DWMWA_CLOAKED, DwmGetWindowAttribute},
        System::{
            Com::{CLSCTX_ALL, CoCreateInstance},
            LibraryLoader::{GetModuleHandleW, GetProcAddress},
            Threading::{
                OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
                QueryFullProcessImageNameW,
            },
        },
        UI::{
            Shell::{IVirtualDesktopManager, VirtualDesktopManager},
            WindowsAndMessaging::{
                GA_ROOT, GET_ANCESTOR_FLAGS, GWL_EXSTYLE, GetAncestor, GetClassNameW,
                GetForegroundWindow, GetWindowLongPtrW, GetWindowTextLengthW, GetWindowTextW,
                GetWindowThreadProcessId, IsWindow, IsWindowVisible, IsZoomed, SendMessageW,
                WS_EX_APPWINDOW, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
            },
        },
    },
    core::{PWSTR, s, w},
};

use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::OnceLock;

// Undocumented information class returning the image name for a process id.
const SYSTEM_PROCESS_ID_INFORMATION: u32 = 88;
const STATUS_INFO_LENGTH_MISMATCH: NTSTATUS = NTSTATUS(0xC000_0004_u32 as i32);

// The documented buffer limit for class names.
const MAX_CLASS_NAME: usize = 256;
const MAX_IMAGE_PATH: usize = 32_768;

#[repr(C)]
struct SystemProcessIdInformation {
    process_id: *mut c_void,
    image_name: UNICODE_STRING,
}

type NtQuerySystemInformationFn =
    unsafe extern "system" fn(u32, *mut c_void, u32, *mut u32) -> NTSTATUS;

fn nt_query_system_information() -> Option<NtQuerySystemInformationFn> {
    static FUNCTION: OnceLock<Option<NtQuerySystemInformationFn>> = OnceLock::new();
    *FUNCTION.get_or_init(|| unsafe {
        let ntdll = GetModuleHandleW(w!("ntdll.dll")).ok()?;
        let address = GetProcAddress(ntdll, s!("NtQuerySystemInformation"))?;
        Some(std::mem::transmute::<
            unsafe extern "system" fn() -> isize,
            NtQuerySystemInformationFn,
        >(address))
    })
}

thread_local! {
    // COM objects are apartment bound, so each thread gets its own manager.
    static DESKTOP_MANAGER: Option<IVirtualDesktopManager> = create_desktop_manager();
}

fn create_desktop_manager() -> Option<IVirtualDesktopManager> {
    match unsafe { CoCreateInstance(&VirtualDesktopManager, None, CLSCTX_ALL) } {
        Ok(manager) => Some(manager),
        Err(e) => {
            log::warn!("Window: Failed to create virtual desktop manager: {e}");
            None
        }
    }
}

/*
 * A thin, copyable wrapper over a window handle. Every query is independent
 * and may fail if the window goes away in between; failures are logged at
 * info level and surface as `None`.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window(pub HWND);

impl From<HWND> for Window {
    fn from(hwnd: HWND) -> Self {
        Window(hwnd)
    }
}

impl Window {
    pub fn foreground() -> Option<Window> {
        let hwnd = unsafe { GetForegroundWindow() };
        (!hwnd.is_invalid()).then_some(Window(hwnd))
    }

    pub fn handle(self) -> HWND {
        self.0
    }

    /// An empty title is `Some("")`; only a failed query yields `None`.
    pub fn title(self) -> Option<String> {
        unsafe { SetLastError(ERROR_SUCCESS) };
        let length = unsafe { GetWindowTextLengthW(self.0) };
        if length <= 0 {
            return match last_error() {
                Some(error) => {
                    log::info!("Window: Getting title length of {:?} failed: {error:?}", self.0);
                    None
                }
                None => Some(String::new()),
            };
        }

        // The title may change between both calls; GetWindowTextW truncates.
        let mut buffer = vec![0u16; length as usize + 1];
        unsafe { SetLastError(ERROR_SUCCESS) };
        let copied = unsafe { GetWindowTextW(self.0, &mut buffer) };
        if copied <= 0 {
            if let Some(error) = last_error() {
                log::info!("Window: Getting title of {:?} failed: {error:?}", self.0);
                return None;
            }
        }
        Some(String::from_utf16_lossy(&buffer[..copied.max(0) as usize]))
    }

    pub fn class_name(self) -> Option<String> {
        let mut buffer = [0u16; MAX_CLASS_NAME + 1];
        let length = unsafe { GetClassNameW(self.0, &mut buffer) };
        if length <= 0 {
            log::info!(
                "Window: Getting class name of {:?} failed: {}",
                self.0,
                windows::core::Error::from_win32()
            );
            return None;
        }
        Some(String::from_utf16_lossy(&buffer[..length as usize]))
    }

    pub fn process_id(self) -> u32 {
        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(self.0, Some(&mut pid)) };
        pid
    }

    /*
     * The owning process' image path. The NT query does not need a process
     * handle, so it also works for elevated processes; when it is unavailable
     * or fails, fall back to opening the process with limited rights.
     */
    pub fn file(self) -> Option<PathBuf> {
        let pid = self.process_id();
        if let Some(path) = nt_image_name(pid) {
            return Some(path);
        }
        match full_process_image_name(pid) {
            Ok(path) => Some(path),
            Err(e) => {
                log::info!("Window: Getting file name of {:?} (pid {pid}) failed: {e}", self.0);
                None
            }
        }
    }

    pub fn on_current_desktop(self) -> Option<bool> {
        DESKTOP_MANAGER.with(|manager| {
            let manager = manager.as_ref()?;
            match unsafe { manager.IsWindowOnCurrentVirtualDesktop(self.0) } {
                Ok(on_current) => Some(on_current.as_bool()),
                Err(e) => {
                    log::info!(
                        "Window: Checking virtual desktop of {:?} failed: {e}",
                        self.0
                    );
                    None
                }
            }
        })
    }

    pub fn valid(self) -> bool {
        unsafe { IsWindow(Some(self.0)) }.as_bool()
    }

    pub fn visible(self) -> bool {
        unsafe { IsWindowVisible(self.0) }.as_bool()
    }

    pub fn maximised(self) -> bool {
        unsafe { IsZoomed(self.0) }.as_bool()
    }

    pub fn cloaked(self) -> bool {
        let mut cloaked = 0u32;
        let result = unsafe {
            DwmGetWindowAttribute(
                self.0,
                DWMWA_CLOAKED,
                &mut cloaked as *mut u32 as *mut c_void,
                std::mem::size_of::<u32>() as u32,
            )
        };
        match result {
            Ok(()) => cloaked != 0,
            Err(e) => {
                log::info!("Window: Checking cloak state of {:?} failed: {e}", self.0);
                false
            }
        }
    }

    pub fn ancestor(self, flags: GET_ANCESTOR_FLAGS) -> Window {
        Window(unsafe { GetAncestor(self.0, flags) })
    }

    pub fn send_message(self, message: u32, wparam: WPARAM, lparam: LPARAM) {
        unsafe { SendMessageW(self.0, message, Some(wparam), Some(lparam)) };
    }

    fn ex_style(self) -> u32 {
        unsafe { GetWindowLongPtrW(self.0, GWL_EXSTYLE) as u32 }
    }

    pub fn traits(self) -> WindowTraits {
        let valid = self.valid();
        if !valid {
            return WindowTraits::default();
        }
        let ex_style = self.ex_style();
        let tool_window = ex_style & WS_EX_TOOLWINDOW.0 != 0;
        let visible = !tool_window && self.visible();
        let cloaked = visible && self.cloaked();
        let is_root = self.ancestor(GA_ROOT) == self;

        WindowTraits {
            valid,
            visible,
            cloaked,
            is_root,
            tool_window,
            no_activate: ex_style & WS_EX_NOACTIVATE.0 != 0,
            app_window: ex_style & WS_EX_APPWINDOW.0 != 0,
            // Only asked for when everything else already qualifies.
            on_current_desktop: if visible && !cloaked && is_root {
                self.on_current_desktop()
            } else {
                None
            },
        }
    }

    pub fn is_user_window(self) -> bool {
        core::is_user_window(&self.traits())
    }

    pub fn info(self) -> WindowInfo {
        WindowInfo {
            class_name: self.class_name(),
            title: self.title(),
            file: self.file(),
        }
    }
}

fn last_error() -> Option<WIN32_ERROR> {
    let error = unsafe { GetLastError() };
    (error != ERROR_SUCCESS).then_some(error)
}

fn nt_image_name(pid: u32) -> Option<PathBuf> {
    let query = nt_query_system_information()?;
    let size = std::mem::size_of::<SystemProcessIdInformation>() as u32;
    let mut info = SystemProcessIdInformation {
        // The structure stores the id in a pointer-sized field.
        process_id: pid as usize as *mut c_void,
        image_name: UNICODE_STRING::default(),
    };

    // The first call only reports the required buffer size.
    let status = unsafe {
        query(
            SYSTEM_PROCESS_ID_INFORMATION,
            &mut info as *mut _ as *mut c_void,
            size,
            std::ptr::null_mut(),
        )
    };
    if status != STATUS_INFO_LENGTH_MISMATCH {
        return None;
    }

    let mut buffer = vec![0u16; info.image_name.MaximumLength as usize / 2 + 1];
    info.image_name.Buffer = PWSTR(buffer.as_mut_ptr());
    info.image_name.MaximumLength = u16::try_from(buffer.len() * 2).unwrap_or(u16::MAX);
    info.image_name.Length = 0;

    let status = unsafe {
        query(
            SYSTEM_PROCESS_ID_INFORMATION,
            &mut info as *mut _ as *mut c_void,
            size,
            std::ptr::null_mut(),
        )
    };
    if status.0 < 0 {
        log::trace!("Window: NT image name query for pid {pid} failed: {status:?}");
        return None;
    }

    let length = (info.image_name.Length as usize / 2).min(buffer.len());
    if length == 0 {
        return None;
    }
    Some(PathBuf::from(String::from_utf16_lossy(&buffer[..length])))
}

fn full_process_image_name(pid: u32) -> PlatformResult<PathBuf> {
    let process = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid)? };
    let mut buffer = vec![0u16; MAX_IMAGE_PATH];
    let mut length = buffer.len() as u32;
    let result = unsafe {
        QueryFullProcessImageNameW(
            process,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut length,
        )
    };
    if let Err(e) = unsafe { CloseHandle(process) } {
        log::debug!("Window: Closing process handle failed: {e}");
    }
    result.map_err(PlatformError::from)?;
    Ok(PathBuf::from(String::from_utf16_lossy(
        &buffer[..length as usize],
    )))
}
