use super::error::{PlatformError, Result as PlatformResult};
use super::flyout;
use super::package;
use super::taskbar::{self, DesktopPoller, Taskbars};
use super::tray_icon::TrayIcon;
use super::types::{AppEvent, EnvironmentInfo, PlatformCommand, PlatformEventHandler};
use super::ui_thread::UiThread;
use crate::core::{Color, DesktopSnapshot, TaskbarAppearance, TaskbarState, TaskbarType};

use windows::{
    Win32::{
        Foundation::{
            COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, POINT, RPC_E_CHANGED_MODE, WPARAM,
        },
        System::{
            Com::{COINIT_APARTMENTTHREADED, CoInitializeEx, CoUninitialize},
            LibraryLoader::GetModuleHandleW,
            WinRT::{RO_INIT_MULTITHREADED, RoInitialize, RoUninitialize},
        },
        UI::{
            Controls::Dialogs::{CC_FULLOPEN, CC_RGBINIT, CHOOSECOLORW, ChooseColorW},
            WindowsAndMessaging::{
                CREATESTRUCTW, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
                GWLP_USERDATA, GetClassInfoExW, GetCursorPos, GetMessageW, GetWindowLongPtrW,
                KillTimer, MSG, PostMessageW, PostQuitMessage, RegisterClassExW,
                RegisterWindowMessageW, SetTimer, SetWindowLongPtrW, TranslateMessage, WM_APP,
                WM_DESTROY, WM_LBUTTONUP, WM_NCCREATE, WM_NCDESTROY, WM_RBUTTONUP, WM_TIMER,
                WNDCLASSEXW, WS_EX_TOOLWINDOW, WS_OVERLAPPED,
            },
        },
    },
    core::{HRESULT, HSTRING, PCWSTR, w},
};

use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::SystemTime;

// Tray icon notifications; the mouse message is in the low word of lParam.
const WM_APP_TRAY: u32 = WM_APP + 1;
// Events queued through an `EventSink` are waiting.
const WM_APP_EVENT: u32 = WM_APP + 2;

const POLL_TIMER_ID: usize = 1;
const POLL_INTERVAL_MS: u32 = 200;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/*
 * Hands events to the main thread from anywhere: the XAML thread, worker
 * threads. The event is queued first and the main window is then woken up
 * with `WM_APP_EVENT`, so events are handled in the order they were sent.
 */
#[derive(Clone)]
pub struct EventSink {
    sender: mpsc::Sender<AppEvent>,
    // The main window, kept as an integer so the sink can cross threads.
    target: isize,
}

impl EventSink {
    fn new(sender: mpsc::Sender<AppEvent>, target: HWND) -> Self {
        EventSink {
            sender,
            target: target.0 as isize,
        }
    }

    pub fn send(&self, event: AppEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("EventSink: Main thread is gone, dropping event.");
            return;
        }
        let target = HWND(self.target as *mut c_void);
        if let Err(e) = unsafe { PostMessageW(Some(target), WM_APP_EVENT, WPARAM(0), LPARAM(0)) } {
            log::warn!("EventSink: Failed to wake the main thread: {e}");
        }
    }
}

// The appearance pair most recently pushed to the taskbars.
#[derive(Debug, Clone, Copy)]
struct AppliedAppearance {
    state: TaskbarState,
    focused: TaskbarAppearance,
    unfocused: TaskbarAppearance,
}

/// Internal state for the Win32 platform layer.
///
/// Everything in here belongs to the main thread. It is reached from the
/// `WndProc` of the hidden main window and from the command handlers. Locks
/// are only held for the duration of a field access, never across a call
/// that can pump messages.
pub(crate) struct Win32ApiInternalState {
    h_instance: HINSTANCE,
    app_name: String,
    environment: EnvironmentInfo,
    main_window: Mutex<Option<HWND>>,
    taskbar_created_message: u32,
    /// A weak reference to the event handler provided by the application logic.
    event_handler: Mutex<Option<Weak<Mutex<dyn PlatformEventHandler>>>>,
    event_sender: mpsc::Sender<AppEvent>,
    event_receiver: Mutex<mpsc::Receiver<AppEvent>>,
    tray: Mutex<Option<TrayIcon>>,
    taskbars: Mutex<Taskbars>,
    poller: Mutex<DesktopPoller>,
    ui_thread: Mutex<Option<UiThread>>,
    last_snapshot: Mutex<Option<DesktopSnapshot>>,
    last_focused_monitor: Mutex<Option<isize>>,
    last_applied: Mutex<Option<AppliedAppearance>>,
    config_file: Option<PathBuf>,
    config_modified: Mutex<Option<SystemTime>>,
    custom_colors: Mutex<[COLORREF; 16]>,
    color_dialog_open: AtomicBool,
    // Only then does this thread owe a `CoUninitialize`.
    com_initialized: bool,
}

// Boxed and handed to the main window through `CreateWindowExW`.
struct WindowCreationContext {
    internal_state_arc: Arc<Win32ApiInternalState>,
}

fn detect_environment() -> EnvironmentInfo {
    let has_package_identity = match package::package_family_name() {
        Ok(name) => name.is_some(),
        Err(e) => {
            log::warn!("Platform: Could not query package identity: {e}");
            false
        }
    };
    let os_build = taskbar::os_build();
    EnvironmentInfo {
        has_package_identity,
        system_has_battery: taskbar::power_status().has_battery,
        os_build,
        taskbar_type: TaskbarType::for_build(os_build),
    }
}

/*
 * Interprets the result of `CoInitializeEx`. `S_OK` and `S_FALSE` both
 * join the apartment and must be balanced by `CoUninitialize`.
 * `RPC_E_CHANGED_MODE` means the thread already lives in another apartment:
 * usable, but not ours to leave.
 */
fn com_apartment_joined(hr: HRESULT) -> PlatformResult<bool> {
    if hr.is_ok() {
        Ok(true)
    } else if hr == RPC_E_CHANGED_MODE {
        log::debug!("Platform: Thread already has a different COM apartment.");
        Ok(false)
    } else {
        Err(PlatformError::InitializationFailed(format!(
            "CoInitializeEx failed: {hr:?}"
        )))
    }
}

fn file_modified(path: &Option<PathBuf>) -> Option<SystemTime> {
    path.as_ref()
        .and_then(|path| std::fs::metadata(path).ok())
        .and_then(|metadata| metadata.modified().ok())
}

impl Win32ApiInternalState {
    fn new(app_name: String, config_file: Option<PathBuf>) -> PlatformResult<Arc<Self>> {
        let com_initialized =
            com_apartment_joined(unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) })?;

        let h_instance = HINSTANCE(unsafe { GetModuleHandleW(PCWSTR::null())? }.0);
        let taskbar_created_message = unsafe { RegisterWindowMessageW(w!("TaskbarCreated")) };
        if taskbar_created_message == 0 {
            log::warn!(
                "Platform: Could not register TaskbarCreated: {}",
                windows::core::Error::from_win32()
            );
        }

        let environment = detect_environment();
        log::info!("Platform: Environment {environment:?}");

        let (event_sender, event_receiver) = mpsc::channel();
        let config_modified = file_modified(&config_file);
        Ok(Arc::new(Self {
            h_instance,
            app_name,
            environment,
            main_window: Mutex::new(None),
            taskbar_created_message,
            event_handler: Mutex::new(None),
            event_sender,
            event_receiver: Mutex::new(event_receiver),
            tray: Mutex::new(None),
            taskbars: Mutex::new(Taskbars::find()),
            poller: Mutex::new(DesktopPoller::new()),
            ui_thread: Mutex::new(None),
            last_snapshot: Mutex::new(None),
            last_focused_monitor: Mutex::new(None),
            last_applied: Mutex::new(None),
            config_file,
            config_modified: Mutex::new(config_modified),
            custom_colors: Mutex::new([COLORREF(0x00FF_FFFF); 16]),
            color_dialog_open: AtomicBool::new(false),
            com_initialized,
        }))
    }

    fn main_window(&self) -> Option<HWND> {
        *lock(&self.main_window)
    }

    fn sink(&self) -> Option<EventSink> {
        self.main_window()
            .map(|hwnd| EventSink::new(self.event_sender.clone(), hwnd))
    }

    fn class_name(&self) -> HSTRING {
        HSTRING::from(format!("{}_MainWindowClass", self.app_name))
    }

    fn register_window_class(&self) -> PlatformResult<()> {
        let class_name = self.class_name();
        unsafe {
            let mut existing = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                ..Default::default()
            };
            if GetClassInfoExW(Some(self.h_instance), &class_name, &mut existing).is_ok() {
                return Ok(());
            }

            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                lpfnWndProc: Some(facade_wnd_proc_router),
                hInstance: self.h_instance,
                lpszClassName: PCWSTR(class_name.as_ptr()),
                ..Default::default()
            };
            if RegisterClassExW(&wc) == 0 {
                return Err(PlatformError::InitializationFailed(format!(
                    "RegisterClassExW failed: {}",
                    windows::core::Error::from_win32()
                )));
            }
        }
        log::debug!("Platform: Registered window class '{class_name}'.");
        Ok(())
    }

    /*
     * The main window is an invisible top-level tool window rather than a
     * message-only one: only top-level windows receive the `TaskbarCreated`
     * broadcast.
     */
    fn create_main_window(self: &Arc<Self>) -> PlatformResult<HWND> {
        self.register_window_class()?;
        let class_name = self.class_name();
        let context = Box::new(WindowCreationContext {
            internal_state_arc: Arc::clone(self),
        });
        let context_ptr = Box::into_raw(context);

        let created = unsafe {
            CreateWindowExW(
                WS_EX_TOOLWINDOW,
                &class_name,
                &HSTRING::from(self.app_name.as_str()),
                WS_OVERLAPPED,
                0,
                0,
                0,
                0,
                None,
                None,
                Some(self.h_instance),
                Some(context_ptr as *const c_void),
            )
        };
        match created {
            Ok(hwnd) => {
                *lock(&self.main_window) = Some(hwnd);
                log::debug!("Platform: Main window created {hwnd:?}.");
                Ok(hwnd)
            }
            Err(e) => {
                // WM_NCDESTROY never ran, so the context is still ours.
                drop(unsafe { Box::from_raw(context_ptr) });
                Err(PlatformError::InitializationFailed(format!(
                    "Failed to create the main window: {e}"
                )))
            }
        }
    }

    /*
     * Hands `event` to the application logic and executes whatever it
     * queued. The handler lock is released before any command runs, since
     * commands such as the color dialog pump messages and can come back here.
     */
    fn dispatch_event(self: &Arc<Self>, event: AppEvent) {
        let Some(handler) = lock(&self.event_handler)
            .as_ref()
            .and_then(|weak_handler| weak_handler.upgrade())
        else {
            log::debug!("Platform: No event handler for {event:?}, dropping it.");
            return;
        };

        let commands = match handler.lock() {
            Ok(mut handler_guard) => {
                handler_guard.handle_event(event);
                let mut commands = Vec::new();
                while let Some(command) = handler_guard.try_dequeue_command() {
                    commands.push(command);
                }
                commands
            }
            Err(_) => {
                log::error!("Platform: Event handler lock is poisoned.");
                return;
            }
        };

        for command in commands {
            if let Err(e) = self.execute_command(command) {
                log::error!("Platform: Error executing command: {e}");
            }
        }
    }

    fn execute_command(self: &Arc<Self>, command: PlatformCommand) -> PlatformResult<()> {
        match command {
            PlatformCommand::SetLogLevel(level) => {
                log::set_max_level(level.into());
                Ok(())
            }
            PlatformCommand::SetTrayIconVisible(visible) => match lock(&self.tray).as_mut() {
                Some(tray) => tray.set_visible(visible),
                None => Ok(()),
            },
            PlatformCommand::SetIgnoredWindows(ignored) => {
                lock(&self.poller).set_ignored(ignored);
                // The next poll has to report again even if nothing moved.
                *lock(&self.last_snapshot) = None;
                Ok(())
            }
            PlatformCommand::ApplyTaskbarAppearance {
                state,
                focused,
                unfocused,
            } => {
                let applied = AppliedAppearance {
                    state,
                    focused,
                    unfocused,
                };
                *lock(&self.last_applied) = Some(applied);
                self.apply_appearance(&applied);
                Ok(())
            }
            PlatformCommand::ShowTrayMenu { items } => self.show_tray_menu(items),
            PlatformCommand::ShowColorPicker { state, initial } => {
                self.show_color_picker(state, initial);
                Ok(())
            }
            PlatformCommand::OpenPath(path) => package::open_path(&path),
            PlatformCommand::LaunchUri(uri) => package::open_uri(&uri),
            PlatformCommand::ToggleStartupTask => self.spawn_startup_worker(true),
            PlatformCommand::ResetDynamicState => {
                let mut taskbars = lock(&self.taskbars);
                taskbars.restore();
                *taskbars = Taskbars::find();
                drop(taskbars);
                *lock(&self.last_applied) = None;
                *lock(&self.last_snapshot) = None;
                *lock(&self.last_focused_monitor) = None;
                log::info!("Platform: Dynamic state reset.");
                Ok(())
            }
            PlatformCommand::DumpDynamicState => {
                self.dump_dynamic_state();
                Ok(())
            }
            PlatformCommand::QuitApplication => match self.main_window() {
                Some(hwnd) => {
                    log::info!("Platform: Quit requested.");
                    unsafe { DestroyWindow(hwnd)? };
                    Ok(())
                }
                None => {
                    unsafe { PostQuitMessage(0) };
                    Ok(())
                }
            },
        }
    }

    // A stale handle means Explorer restarted, so look the taskbars up again.
    fn apply_appearance(&self, applied: &AppliedAppearance) {
        let focused_monitor = DesktopPoller::focused_monitor();
        *lock(&self.last_focused_monitor) = focused_monitor.map(|monitor| monitor.0 as isize);

        let mut taskbars = lock(&self.taskbars);
        let all_valid = taskbars.apply(
            focused_monitor,
            &applied.focused,
            &applied.unfocused,
            self.environment.taskbar_type,
        );
        if !all_valid {
            log::info!("Platform: A taskbar handle went stale, looking them up again.");
            *taskbars = Taskbars::find();
            taskbars.apply(
                focused_monitor,
                &applied.focused,
                &applied.unfocused,
                self.environment.taskbar_type,
            );
        }
    }

    fn show_tray_menu(&self, items: Vec<crate::core::MenuItem>) -> PlatformResult<()> {
        let Some(sink) = self.sink() else {
            return Err(PlatformError::OperationFailed(
                "Main window is not available for the flyout".to_string(),
            ));
        };
        let mut at = POINT::default();
        unsafe { GetCursorPos(&mut at)? };

        let ui_thread = lock(&self.ui_thread);
        let Some(ui_thread) = ui_thread.as_ref() else {
            return Err(PlatformError::OperationFailed(
                "UI thread is not running".to_string(),
            ));
        };
        ui_thread.dispatch(move |context| flyout::show(context, &items, at, &sink))
    }

    /*
     * The common color dialog is modal and pumps messages, so no lock is held
     * while it is up and a second request while it is open is ignored. The
     * dialog has no alpha channel; the starting color's alpha is kept.
     */
    fn show_color_picker(self: &Arc<Self>, state: TaskbarState, initial: Color) {
        if self.color_dialog_open.swap(true, Ordering::SeqCst) {
            log::debug!("Platform: Color dialog already open, ignoring request for {state:?}.");
            return;
        }

        let mut custom_colors = *lock(&self.custom_colors);
        let mut dialog = CHOOSECOLORW {
            lStructSize: std::mem::size_of::<CHOOSECOLORW>() as u32,
            hwndOwner: self.main_window().unwrap_or_default(),
            rgbResult: COLORREF(initial.to_colorref()),
            lpCustColors: custom_colors.as_mut_ptr(),
            Flags: CC_RGBINIT | CC_FULLOPEN,
            ..Default::default()
        };
        let picked = unsafe { ChooseColorW(&mut dialog) }.as_bool();
        *lock(&self.custom_colors) = custom_colors;
        self.color_dialog_open.store(false, Ordering::SeqCst);

        let color = picked.then(|| Color::from_colorref(dialog.rgbResult.0, initial.a));
        self.dispatch_event(AppEvent::ColorPicked { state, color });
    }

    /*
     * Startup task calls block on WinRT async operations, so they run on a
     * short-lived worker that reports back through the event sink.
     */
    fn spawn_startup_worker(&self, toggle: bool) -> PlatformResult<()> {
        if !self.environment.has_package_identity {
            log::debug!("Platform: No package identity, startup task unavailable.");
            return Ok(());
        }
        let Some(sink) = self.sink() else {
            return Ok(());
        };

        thread::Builder::new()
            .name("startup-task".to_string())
            .spawn(move || {
                let initialized = unsafe { RoInitialize(RO_INIT_MULTITHREADED) }.is_ok();
                let result = if toggle {
                    package::toggle_startup_task()
                } else {
                    package::startup_state()
                };
                let state = result.unwrap_or_else(|e| {
                    log::error!("Platform: Startup task query failed: {e}");
                    None
                });
                if initialized {
                    unsafe { RoUninitialize() };
                }
                sink.send(AppEvent::StartupStateReported { state });
            })
            .map_err(|e| {
                PlatformError::OperationFailed(format!("Failed to spawn startup task worker: {e}"))
            })?;
        Ok(())
    }

    fn dump_dynamic_state(&self) {
        log::info!("===== Begin platform state dump =====");
        log::info!("Environment: {:?}", self.environment);
        log::info!("Main window: {:?}", self.main_window());
        log::info!(
            "Tray icon shown: {}",
            lock(&self.tray).as_ref().is_some_and(TrayIcon::is_shown)
        );
        for (index, taskbar) in lock(&self.taskbars).windows().iter().enumerate() {
            log::info!(
                "Taskbar {index}: {:?} valid={} class={:?}",
                taskbar.handle(),
                taskbar.valid(),
                taskbar.class_name()
            );
        }
        log::info!("Focused monitor: {:?}", *lock(&self.last_focused_monitor));
        log::info!("Last snapshot: {:?}", *lock(&self.last_snapshot));
        log::info!("Last applied: {:?}", *lock(&self.last_applied));
        let island = lock(&self.ui_thread)
            .as_ref()
            .and_then(|ui_thread| ui_thread.context().current_window());
        log::info!("Flyout island window: {island:?}");
        log::info!("===== End platform state dump =====");
    }

    /*
     * One polling tick: report desktop changes, follow the foreground window
     * across monitors and notice edits to the settings file.
     */
    fn on_poll_timer(self: &Arc<Self>) {
        let snapshot = lock(&self.poller).poll();
        let changed = {
            let mut last = lock(&self.last_snapshot);
            let changed = last.as_ref() != Some(&snapshot);
            *last = Some(snapshot);
            changed
        };
        if changed {
            self.dispatch_event(AppEvent::DesktopStateChanged { snapshot });
        }

        let focused_monitor =
            DesktopPoller::focused_monitor().map(|monitor| monitor.0 as isize);
        if *lock(&self.last_focused_monitor) != focused_monitor {
            let applied = *lock(&self.last_applied);
            match applied {
                Some(applied) => {
                    log::trace!("Platform: Focused monitor changed, reapplying {:?}.", applied.state);
                    self.apply_appearance(&applied);
                }
                None => *lock(&self.last_focused_monitor) = focused_monitor,
            }
        }

        let modified = file_modified(&self.config_file);
        let config_changed = {
            let mut last = lock(&self.config_modified);
            let changed = modified.is_some() && *last != modified;
            *last = modified;
            changed
        };
        if config_changed {
            log::debug!("Platform: Settings file changed on disk.");
            self.dispatch_event(AppEvent::ConfigFileChanged);
        }
    }

    fn on_taskbar_created(self: &Arc<Self>) {
        log::info!("Platform: Explorer restarted, recreating tray icon and taskbar handles.");
        if let Some(tray) = lock(&self.tray).as_mut() {
            let visible = tray.is_shown();
            if let Err(e) = tray.readd(visible) {
                log::error!("Platform: Failed to re-add the tray icon: {e}");
            }
        }
        *lock(&self.taskbars) = Taskbars::find();
        *lock(&self.last_applied) = None;
        self.dispatch_event(AppEvent::TaskbarCreated);
    }

    fn drain_queued_events(self: &Arc<Self>) {
        let events: Vec<AppEvent> = lock(&self.event_receiver).try_iter().collect();
        for event in events {
            self.dispatch_event(event);
        }
    }

    fn handle_window_message(
        self: &Arc<Self>,
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_APP_TRAY => {
                let mouse_message = (lparam.0 & 0xFFFF) as u32;
                if mouse_message == WM_LBUTTONUP || mouse_message == WM_RBUTTONUP {
                    self.dispatch_event(AppEvent::TrayMenuRequested);
                }
                LRESULT(0)
            }
            WM_APP_EVENT => {
                self.drain_queued_events();
                LRESULT(0)
            }
            WM_TIMER if wparam.0 == POLL_TIMER_ID => {
                self.on_poll_timer();
                LRESULT(0)
            }
            WM_DESTROY => {
                log::debug!("Platform: WM_DESTROY for main window {hwnd:?}.");
                let _ = unsafe { KillTimer(Some(hwnd), POLL_TIMER_ID) };
                unsafe { PostQuitMessage(0) };
                LRESULT(0)
            }
            _ if msg != 0 && msg == self.taskbar_created_message => {
                self.on_taskbar_created();
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }
}

impl Drop for Win32ApiInternalState {
    fn drop(&mut self) {
        if self.com_initialized {
            log::debug!("Platform: Win32ApiInternalState dropped, calling CoUninitialize.");
            unsafe { CoUninitialize() };
        }
    }
}

unsafe extern "system" fn facade_wnd_proc_router(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    // The creation context travels in lpCreateParams and then lives in
    // GWLP_USERDATA until WM_NCDESTROY.
    let context_ptr = if msg == WM_NCCREATE {
        let create_struct = unsafe { &*(lparam.0 as *const CREATESTRUCTW) };
        let context_raw_ptr = create_struct.lpCreateParams as *mut WindowCreationContext;
        unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, context_raw_ptr as isize) };
        context_raw_ptr
    } else {
        unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut WindowCreationContext }
    };

    if context_ptr.is_null() {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    let internal_state_arc = Arc::clone(&unsafe { &*context_ptr }.internal_state_arc);
    let result = internal_state_arc.handle_window_message(hwnd, msg, wparam, lparam);

    if msg == WM_NCDESTROY {
        unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0) };
        drop(unsafe { Box::from_raw(context_ptr) });
    }
    result
}

/// The primary interface to the platform abstraction layer.
pub struct PlatformInterface {
    internal_state: Arc<Win32ApiInternalState>,
}

impl PlatformInterface {
    /// `config_file` is watched for edits while the application runs.
    pub fn new(app_name: String, config_file: Option<PathBuf>) -> PlatformResult<Self> {
        let internal_state = Win32ApiInternalState::new(app_name, config_file)?;
        Ok(PlatformInterface { internal_state })
    }

    /*
     * Brings up the main window, the XAML thread and the tray icon, reports
     * `TrayStarted` and runs the message loop until quit. On the way out the
     * UI thread is joined and the taskbars get their own look back.
     */
    pub fn run(&self, event_handler: Arc<Mutex<dyn PlatformEventHandler>>) -> PlatformResult<()> {
        let state = &self.internal_state;
        *lock(&state.event_handler) = Some(Arc::downgrade(&event_handler));

        let hwnd = state.create_main_window()?;
        *lock(&state.ui_thread) = Some(UiThread::spawn("xaml-ui")?);

        let mut tray = TrayIcon::new(hwnd, WM_APP_TRAY, &state.app_name);
        if let Err(e) = tray.set_visible(true) {
            log::error!("Platform: Failed to add the tray icon: {e}");
        }
        *lock(&state.tray) = Some(tray);

        state.dispatch_event(AppEvent::TrayStarted {
            environment: state.environment,
            startup_state: None,
        });
        // Without a report the startup entry simply stays disabled.
        if let Err(e) = state.spawn_startup_worker(false) {
            log::error!("Platform: Could not query the startup task: {e}");
        }

        if unsafe { SetTimer(Some(hwnd), POLL_TIMER_ID, POLL_INTERVAL_MS, None) } == 0 {
            log::error!(
                "Platform: SetTimer failed, desktop changes will not be tracked: {}",
                windows::core::Error::from_win32()
            );
        }

        let loop_result = Self::message_loop();

        if let Ok(mut handler_guard) = event_handler.lock() {
            handler_guard.on_quit();
        }
        *lock(&state.event_handler) = None;

        let ui_thread = lock(&state.ui_thread).take();
        if let Some(join) = ui_thread.and_then(UiThread::shutdown) {
            if join.join().is_err() {
                log::error!("Platform: UI thread panicked during shutdown.");
            }
        }
        lock(&state.taskbars).restore();
        lock(&state.tray).take();
        log::info!("Platform: Message loop exited cleanly.");
        loop_result
    }

    fn message_loop() -> PlatformResult<()> {
        let mut msg = MSG::default();
        loop {
            let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
            match result.0 {
                0 => return Ok(()),
                -1 => {
                    return Err(PlatformError::OperationFailed(format!(
                        "GetMessageW failed: {}",
                        windows::core::Error::from_win32()
                    )));
                }
                _ => unsafe {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                },
            }
        }
    }
}
