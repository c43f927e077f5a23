/*
 * Helpers for running with (or without) package identity: the family name,
 * the per-package storage folder, the startup task that packaged builds
 * register, and shell launching of paths and URIs.
 */
use super::error::{PlatformError, Result as PlatformResult};
use crate::core::StartupState;

use windows::{
    ApplicationModel::{StartupTask, StartupTaskState},
    Win32::{
        Foundation::{APPMODEL_ERROR_NO_PACKAGE, ERROR_INSUFFICIENT_BUFFER, ERROR_SUCCESS},
        Storage::Packaging::Appx::GetCurrentPackageFamilyName,
        System::Com::CoTaskMemFree,
        UI::{
            Shell::{
                FOLDERID_LocalAppData, KF_FLAG_NO_PACKAGE_REDIRECTION, SHGetKnownFolderPath,
                ShellExecuteW,
            },
            WindowsAndMessaging::SW_SHOWNORMAL,
        },
    },
    core::{HSTRING, PCWSTR, PWSTR, w},
};

use std::ffi::c_void;
use std::path::{Path, PathBuf};

pub const STARTUP_TASK_ID: &str = "TintbarStartupTask";
const STARTUP_APPS_SETTINGS_URI: &str = "ms-settings:startupapps";

/// `Ok(None)` when the process has no package identity.
pub fn package_family_name() -> PlatformResult<Option<String>> {
    let mut length = 0u32;
    let result = unsafe { GetCurrentPackageFamilyName(&mut length, None) };
    if result == APPMODEL_ERROR_NO_PACKAGE {
        return Ok(None);
    }
    if result != ERROR_INSUFFICIENT_BUFFER {
        return Err(windows::core::Error::from_hresult(result.to_hresult()).into());
    }

    let mut buffer = vec![0u16; length as usize];
    let result =
        unsafe { GetCurrentPackageFamilyName(&mut length, Some(PWSTR(buffer.as_mut_ptr()))) };
    if result != ERROR_SUCCESS {
        return Err(windows::core::Error::from_hresult(result.to_hresult()).into());
    }

    // The reported length includes the terminator.
    let chars = (length as usize).saturating_sub(1).min(buffer.len());
    Ok(Some(String::from_utf16_lossy(&buffer[..chars])))
}

/*
 * `%LOCALAPPDATA%\Packages\<family name>`. The known folder is queried
 * without package redirection so the real location comes back even from
 * inside the package.
 */
pub fn app_storage_folder() -> PlatformResult<Option<PathBuf>> {
    let Some(family_name) = package_family_name()? else {
        return Ok(None);
    };

    let local_app_data = unsafe {
        SHGetKnownFolderPath(&FOLDERID_LocalAppData, KF_FLAG_NO_PACKAGE_REDIRECTION, None)?
    };
    let path = unsafe { local_app_data.to_string() };
    unsafe { CoTaskMemFree(Some(local_app_data.0 as *const c_void)) };
    let path = path.map_err(|e| {
        PlatformError::OperationFailed(format!("Local app data path is not valid UTF-16: {e}"))
    })?;

    Ok(Some(PathBuf::from(path).join("Packages").join(family_name)))
}

fn shell_open(target: &HSTRING) -> PlatformResult<()> {
    let instance = unsafe {
        ShellExecuteW(
            None,
            w!("open"),
            target,
            PCWSTR::null(),
            PCWSTR::null(),
            SW_SHOWNORMAL,
        )
    };
    // Values above 32 indicate success.
    if instance.0 as usize > 32 {
        Ok(())
    } else {
        Err(PlatformError::OperationFailed(format!(
            "ShellExecuteW failed for '{target}' (code {})",
            instance.0 as usize
        )))
    }
}

pub fn open_uri(uri: &str) -> PlatformResult<()> {
    log::debug!("Package: Launching {uri}");
    shell_open(&HSTRING::from(uri))
}

pub fn open_path(path: &Path) -> PlatformResult<()> {
    log::debug!("Package: Opening {}", path.display());
    shell_open(&HSTRING::from(path.as_os_str()))
}

fn map_startup_state(state: StartupTaskState) -> Option<StartupState> {
    match state {
        StartupTaskState::Disabled => Some(StartupState::Disabled),
        StartupTaskState::DisabledByUser => Some(StartupState::DisabledByUser),
        StartupTaskState::Enabled => Some(StartupState::Enabled),
        StartupTaskState::DisabledByPolicy => Some(StartupState::DisabledByPolicy),
        StartupTaskState::EnabledByPolicy => Some(StartupState::EnabledByPolicy),
        _ => None,
    }
}

fn startup_task() -> PlatformResult<StartupTask> {
    Ok(StartupTask::GetAsync(&HSTRING::from(STARTUP_TASK_ID))?.get()?)
}

// Blocks on WinRT async calls; run it off the UI threads.
pub fn startup_state() -> PlatformResult<Option<StartupState>> {
    Ok(map_startup_state(startup_task()?.State()?))
}

/*
 * Enables a disabled task or disables an enabled one. When the user turned
 * the task off in the system settings, an enable request cannot override
 * that, so the startup apps page is opened instead.
 */
pub fn toggle_startup_task() -> PlatformResult<Option<StartupState>> {
    let task = startup_task()?;
    let state = match task.State()? {
        StartupTaskState::Enabled => {
            task.Disable()?;
            task.State()?
        }
        StartupTaskState::Disabled => task.RequestEnableAsync()?.get()?,
        StartupTaskState::DisabledByUser => {
            open_uri(STARTUP_APPS_SETTINGS_URI)?;
            StartupTaskState::DisabledByUser
        }
        other => {
            log::info!("Package: Startup task is controlled by policy ({other:?}).");
            other
        }
    };
    Ok(map_startup_state(state))
}
