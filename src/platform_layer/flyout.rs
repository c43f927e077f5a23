use super::app::EventSink;
use super::error::{PlatformError, Result as PlatformResult};
use super::types::AppEvent;
use super::ui_thread::UiContext;
use super::xaml::{
    IDesktopWindowXamlSourceNative,
    Windows::{
        Foundation::EventHandler,
        UI::Xaml::{
            Controls::{
                Grid, MenuFlyout, MenuFlyoutItem, MenuFlyoutItemBase, MenuFlyoutSeparator,
                MenuFlyoutSubItem, ToggleMenuFlyoutItem,
            },
            Hosting::DesktopWindowXamlSource,
            RoutedEventHandler,
        },
    },
};
use crate::core::{MenuItem, MenuItemKind};

use windows::{
    System::{DispatcherQueue, DispatcherQueueHandler},
    Win32::{
        Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, POINT, WPARAM},
        System::LibraryLoader::GetModuleHandleW,
        UI::WindowsAndMessaging::{
            CreateWindowExW, DefWindowProcW, GetClassInfoExW, RegisterClassExW, SW_SHOW,
            SWP_SHOWWINDOW, SetForegroundWindow, SetWindowPos, ShowWindow, WNDCLASSEXW, WS_POPUP,
            WS_EX_NOREDIRECTIONBITMAP, WS_EX_TOOLWINDOW, WS_EX_TOPMOST,
        },
    },
    core::{HSTRING, IInspectable, Interface, PCWSTR, w},
};

use std::ffi::c_void;
use std::sync::Arc;

const HOST_CLASS: PCWSTR = w!("TintbarFlyoutHost");

/*
 * Shows the tray flyout at `at`. The `MenuItem` tree becomes a XAML
 * `MenuFlyout` inside a fresh island: toggles and radios render as toggle
 * items (the model keeps radios exclusive), hidden items are left out, and
 * every click is forwarded as `TrayMenuItemClicked`. The island is torn down
 * once the flyout closes.
 *
 * Runs on the UI thread.
 */
pub fn show(
    context: &Arc<UiContext>,
    items: &[MenuItem],
    at: POINT,
    sink: &EventSink,
) -> PlatformResult<()> {
    let host = create_host_window(at)?;
    let source = DesktopWindowXamlSource::new()?;
    let native = source.cast::<IDesktopWindowXamlSourceNative>()?;
    unsafe {
        native.AttachToWindow(host).ok()?;
        let mut island = HWND::default();
        native.get_WindowHandle(&mut island).ok()?;
        SetWindowPos(island, None, 0, 0, 1, 1, SWP_SHOWWINDOW)?;
    }

    let root = Grid::new()?;
    source.SetContent(&root)?;
    context.set_island(host, source)?;

    let flyout = MenuFlyout::new()?;
    let entries = flyout.Items()?;
    for item in items.iter().filter(|item| item.visible) {
        entries.Append(&build_item(item, sink)?)?;
    }

    let closed_context = Arc::clone(context);
    let host_handle = host.0 as isize;
    flyout.Closed(&EventHandler::<IInspectable>::new(move |_, _| {
        let context = Arc::clone(&closed_context);
        // The island cannot be closed from inside one of its own events.
        let teardown = DispatcherQueueHandler::new(move || {
            context.clear_island(HWND(host_handle as *mut c_void));
            Ok(())
        });
        DispatcherQueue::GetForCurrentThread()?.TryEnqueue(&teardown)?;
        Ok(())
    }))?;

    // The flyout only dismisses on outside clicks when its window is in front.
    let _ = unsafe { SetForegroundWindow(host) };
    flyout.ShowAt(&root)?;
    log::debug!("Flyout: Shown with {} top-level items.", items.len());
    Ok(())
}

fn build_item(item: &MenuItem, sink: &EventSink) -> PlatformResult<MenuFlyoutItemBase> {
    let built: MenuFlyoutItemBase = match item.kind {
        MenuItemKind::Separator => MenuFlyoutSeparator::new()?.cast()?,
        MenuItemKind::SubMenu => {
            let submenu = MenuFlyoutSubItem::new()?;
            submenu.SetText(&HSTRING::from(item.text.as_str()))?;
            let children = submenu.Items()?;
            for child in item.children.iter().filter(|child| child.visible) {
                children.Append(&build_item(child, sink)?)?;
            }
            submenu.cast()?
        }
        MenuItemKind::Toggle | MenuItemKind::Radio => {
            let toggle = ToggleMenuFlyoutItem::new()?;
            toggle.SetIsChecked(item.checked)?;
            wire_clickable(&toggle.cast()?, item, sink)?;
            toggle.cast()?
        }
        MenuItemKind::Command => {
            let command = MenuFlyoutItem::new()?;
            wire_clickable(&command, item, sink)?;
            command.cast()?
        }
    };
    built.SetIsEnabled(item.enabled)?;
    Ok(built)
}

fn wire_clickable(target: &MenuFlyoutItem, item: &MenuItem, sink: &EventSink) -> PlatformResult<()> {
    target.SetText(&HSTRING::from(item.text.as_str()))?;
    let sink = sink.clone();
    let item_id = item.id;
    target.Click(&RoutedEventHandler::new(move |_, _| {
        sink.send(AppEvent::TrayMenuItemClicked { item_id });
        Ok(())
    }))?;
    Ok(())
}

unsafe extern "system" fn host_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

fn create_host_window(at: POINT) -> PlatformResult<HWND> {
    unsafe {
        let instance = HINSTANCE(GetModuleHandleW(PCWSTR::null())?.0);

        let mut existing = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            ..Default::default()
        };
        if GetClassInfoExW(Some(instance), HOST_CLASS, &mut existing).is_err() {
            let class = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                lpfnWndProc: Some(host_wnd_proc),
                hInstance: instance,
                lpszClassName: HOST_CLASS,
                ..Default::default()
            };
            if RegisterClassExW(&class) == 0 {
                return Err(PlatformError::InitializationFailed(format!(
                    "RegisterClassExW failed for the flyout host: {}",
                    windows::core::Error::from_win32()
                )));
            }
        }

        let hwnd = CreateWindowExW(
            WS_EX_TOOLWINDOW | WS_EX_TOPMOST | WS_EX_NOREDIRECTIONBITMAP,
            HOST_CLASS,
            PCWSTR::null(),
            WS_POPUP,
            at.x,
            at.y,
            1,
            1,
            None,
            None,
            Some(instance),
            None,
        )?;
        let _ = ShowWindow(hwnd, SW_SHOW);
        Ok(hwnd)
    }
}
