/*
 * WinRT bindings for the XAML island classes, generated from the Windows
 * metadata by the build script. The `windows` crate no longer ships the
 * `Windows.UI.Xaml` namespace, so `Windows::UI::Xaml::*` and the types its
 * signatures need (collections, event handlers) come from here.
 *
 * The two native interop interfaces are COM rather than WinRT and are not
 * part of that metadata; they are declared by hand below.
 */
#![allow(
    clippy::all,
    dead_code,
    missing_docs,
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    unused_imports
)]

include!(concat!(env!("OUT_DIR"), "/xaml_bindings.rs"));

use windows::Win32::{Foundation::HWND, UI::WindowsAndMessaging::MSG};
use windows_core::{BOOL, HRESULT, IUnknown, IUnknown_Vtbl, interface};

/// Attaches a `DesktopWindowXamlSource` to a Win32 parent window.
#[interface("3cbcf1bf-2f76-4e9c-96ab-e84b37972554")]
pub unsafe trait IDesktopWindowXamlSourceNative: IUnknown {
    fn AttachToWindow(&self, parent: HWND) -> HRESULT;
    fn get_WindowHandle(&self, hwnd: *mut HWND) -> HRESULT;
}

/// Lets the island see keyboard messages before the host's message loop.
#[interface("e3dcd8c7-3057-4692-99c3-7b7720afda31")]
pub unsafe trait IDesktopWindowXamlSourceNative2: IDesktopWindowXamlSourceNative {
    fn PreTranslateMessage(&self, message: *const MSG, result: *mut BOOL) -> HRESULT;
}
