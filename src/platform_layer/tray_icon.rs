use super::error::{PlatformError, Result as PlatformResult};

use windows::Win32::{
    Foundation::HWND,
    UI::{
        Shell::{NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW, Shell_NotifyIconW},
        WindowsAndMessaging::{IDI_APPLICATION, LoadIconW},
    },
};

const TRAY_UID: u32 = 1;

/*
 * The notification area icon. Clicks arrive at the owner window as
 * `callback_message`, with the mouse message in the low word of `lParam`.
 * Explorer forgets every icon when it restarts, so the owner calls `readd`
 * on `TaskbarCreated`.
 */
pub struct TrayIcon {
    owner: HWND,
    callback_message: u32,
    tooltip: String,
    shown: bool,
}

impl TrayIcon {
    pub fn new(owner: HWND, callback_message: u32, tooltip: &str) -> Self {
        TrayIcon {
            owner,
            callback_message,
            tooltip: tooltip.to_string(),
            shown: false,
        }
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    fn data(&self) -> NOTIFYICONDATAW {
        NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: self.owner,
            uID: TRAY_UID,
            ..Default::default()
        }
    }

    pub fn set_visible(&mut self, visible: bool) -> PlatformResult<()> {
        match (visible, self.shown) {
            (true, false) => self.add(),
            (false, true) => self.remove(),
            _ => Ok(()),
        }
    }

    fn add(&mut self) -> PlatformResult<()> {
        let mut data = self.data();
        data.uFlags = NIF_MESSAGE | NIF_TIP | NIF_ICON;
        data.uCallbackMessage = self.callback_message;
        data.hIcon = unsafe { LoadIconW(None, IDI_APPLICATION)? };
        for (slot, unit) in data
            .szTip
            .iter_mut()
            .zip(self.tooltip.encode_utf16().take(data.szTip.len() - 1))
        {
            *slot = unit;
        }

        if unsafe { Shell_NotifyIconW(NIM_ADD, &data) }.as_bool() {
            log::debug!("TrayIcon: Added.");
            self.shown = true;
            Ok(())
        } else {
            Err(PlatformError::OperationFailed(
                "Shell_NotifyIconW(NIM_ADD) failed".to_string(),
            ))
        }
    }

    fn remove(&mut self) -> PlatformResult<()> {
        self.shown = false;
        if unsafe { Shell_NotifyIconW(NIM_DELETE, &self.data()) }.as_bool() {
            log::debug!("TrayIcon: Removed.");
            Ok(())
        } else {
            Err(PlatformError::OperationFailed(
                "Shell_NotifyIconW(NIM_DELETE) failed".to_string(),
            ))
        }
    }

    /// After an Explorer restart the old icon is gone, so this only adds.
    pub fn readd(&mut self, visible: bool) -> PlatformResult<()> {
        self.shown = false;
        self.set_visible(visible)
    }
}

impl Drop for TrayIcon {
    fn drop(&mut self) {
        if self.shown {
            if let Err(e) = self.remove() {
                log::debug!("TrayIcon: {e}");
            }
        }
    }
}
