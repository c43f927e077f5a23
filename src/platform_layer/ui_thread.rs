use super::error::{PlatformError, Result as PlatformResult};
use super::window::Window;
use super::xaml::{
    IDesktopWindowXamlSourceNative2,
    Windows::UI::Xaml::Hosting::{DesktopWindowXamlSource, WindowsXamlManager},
};

use windows::{
    System::{DispatcherQueue, DispatcherQueueHandler, DispatcherQueuePriority},
    UI::Core::CoreWindow,
    Win32::{
        Foundation::HWND,
        System::WinRT::{ICoreWindowInterop, RO_INIT_SINGLETHREADED, RoInitialize, RoUninitialize},
        UI::{
            Input::KeyboardAndMouse::{VK_F4, VK_SPACE},
            WindowsAndMessaging::{
                DestroyWindow, DispatchMessageW, GA_ROOT, GetMessageW, MSG, PostQuitMessage,
                SW_HIDE, ShowWindow, TranslateMessage, WM_SYSKEYDOWN,
            },
        },
    },
    core::{BOOL, Interface},
};

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/*
 * The island currently hosted by the UI thread: its host window and the XAML
 * source attached to it. The manager lives here too so teardown can close it.
 */
#[derive(Default)]
struct IslandSlot {
    window: Option<HWND>,
    source: Option<DesktopWindowXamlSource>,
    native: Option<IDesktopWindowXamlSourceNative2>,
    manager: Option<WindowsXamlManager>,
}

// SAFETY: the XAML objects are only created, used and released on the UI
// thread. Other threads only reach the slot through `UiContext` closures
// that the dispatcher runs on that thread.
unsafe impl Send for IslandSlot {}

/*
 * Shared between the UI thread and its owner. The one lock guards the
 * current island; it is never held while calling into XAML so that
 * re-entrant messages do not deadlock.
 */
pub struct UiContext {
    slot: Mutex<IslandSlot>,
}

impl UiContext {
    fn lock(&self) -> MutexGuard<'_, IslandSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_window(&self) -> Option<HWND> {
        self.lock().window
    }

    /// Makes `source` the current island. The previous one is torn down.
    pub fn set_island(&self, window: HWND, source: DesktopWindowXamlSource) -> PlatformResult<()> {
        let native = source.cast::<IDesktopWindowXamlSourceNative2>()?;
        let previous = {
            let mut slot = self.lock();
            let previous = (slot.window.take(), slot.source.take());
            slot.window = Some(window);
            slot.source = Some(source);
            slot.native = Some(native);
            previous
        };
        close_island(previous.0, previous.1);
        Ok(())
    }

    /// Tears down the current island if it is still hosted in `window`.
    pub fn clear_island(&self, window: HWND) {
        let taken = {
            let mut slot = self.lock();
            if slot.window != Some(window) {
                return;
            }
            slot.native = None;
            (slot.window.take(), slot.source.take())
        };
        close_island(taken.0, taken.1);
    }

    fn native_source(&self) -> Option<IDesktopWindowXamlSourceNative2> {
        self.lock().native.clone()
    }

    fn teardown(&self) {
        let (window, source, manager) = {
            let mut slot = self.lock();
            slot.native = None;
            (slot.window.take(), slot.source.take(), slot.manager.take())
        };
        close_island(window, source);
        if let Some(manager) = manager {
            if let Err(e) = manager.Close() {
                log::warn!("UiThread: Closing the XAML manager failed: {e}");
            }
        }
    }
}

fn close_island(window: Option<HWND>, source: Option<DesktopWindowXamlSource>) {
    if let Some(source) = source {
        if let Err(e) = source.Close() {
            log::warn!("UiThread: Closing XAML source failed: {e}");
        }
    }
    if let Some(window) = window {
        if let Err(e) = unsafe { DestroyWindow(window) } {
            log::debug!("UiThread: Destroying island window failed: {e}");
        }
    }
}

/*
 * A dedicated thread hosting XAML islands. It runs in a single-threaded
 * apartment with its own `WindowsXamlManager` and message loop; work is
 * handed to it through its `DispatcherQueue`.
 */
pub struct UiThread {
    dispatcher: DispatcherQueue,
    context: Arc<UiContext>,
    thread: Option<JoinHandle<()>>,
}

impl UiThread {
    /// Blocks until the thread is ready, or returns why it could not start.
    pub fn spawn(name: &str) -> PlatformResult<Self> {
        let context = Arc::new(UiContext {
            slot: Mutex::new(IslandSlot::default()),
        });
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_context = Arc::clone(&context);

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || thread_main(thread_context, ready_tx))
            .map_err(|e| {
                PlatformError::InitializationFailed(format!("Failed to spawn UI thread: {e}"))
            })?;

        match ready_rx.recv() {
            Ok(Ok(dispatcher)) => {
                log::debug!("UiThread: '{name}' is ready.");
                Ok(UiThread {
                    dispatcher,
                    context,
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(PlatformError::InitializationFailed(
                    "UI thread exited before signalling readiness".to_string(),
                ))
            }
        }
    }

    pub fn context(&self) -> &Arc<UiContext> {
        &self.context
    }

    pub fn dispatch<F>(&self, task: F) -> PlatformResult<()>
    where
        F: FnOnce(&Arc<UiContext>) -> PlatformResult<()> + Send + 'static,
    {
        self.enqueue(DispatcherQueuePriority::Normal, task)
    }

    fn enqueue<F>(&self, priority: DispatcherQueuePriority, task: F) -> PlatformResult<()>
    where
        F: FnOnce(&Arc<UiContext>) -> PlatformResult<()> + Send + 'static,
    {
        let context = Arc::clone(&self.context);
        let mut task = Some(task);
        let handler = DispatcherQueueHandler::new(move || {
            if let Some(task) = task.take() {
                if let Err(e) = task(&context) {
                    log::error!("UiThread: Dispatched task failed: {e}");
                }
            }
            Ok(())
        });

        if self.dispatcher.TryEnqueueWithPriority(priority, &handler)? {
            Ok(())
        } else {
            Err(PlatformError::OperationFailed(
                "UI thread dispatcher is shutting down".to_string(),
            ))
        }
    }

    /*
     * Queues the teardown behind any pending work and hands back the join
     * handle. The thread drops the island, closes the manager and leaves its
     * message loop; the caller decides whether to wait for it.
     */
    pub fn shutdown(mut self) -> Option<JoinHandle<()>> {
        self.request_teardown();
        self.thread.take()
    }

    fn request_teardown(&self) {
        let result = self.enqueue(DispatcherQueuePriority::Low, |context| {
            context.teardown();
            unsafe { PostQuitMessage(0) };
            Ok(())
        });
        if let Err(e) = result {
            log::error!("UiThread: Failed to queue teardown: {e}");
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            log::debug!("UiThread: Dropped without shutdown, tearing down now.");
            self.request_teardown();
            if thread.join().is_err() {
                log::error!("UiThread: Thread panicked during teardown.");
            }
        }
    }
}

fn thread_main(
    context: Arc<UiContext>,
    ready: mpsc::Sender<PlatformResult<DispatcherQueue>>,
) {
    if let Err(e) = unsafe { RoInitialize(RO_INIT_SINGLETHREADED) } {
        let _ = ready.send(Err(PlatformError::InitializationFailed(format!(
            "Failed to initialize the UI thread apartment: {e}"
        ))));
        return;
    }

    match init_xaml() {
        Ok((manager, dispatcher)) => {
            context.lock().manager = Some(manager);
            let _ = ready.send(Ok(dispatcher));
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            unsafe { RoUninitialize() };
            return;
        }
    }

    let mut msg = MSG::default();
    loop {
        let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        match result.0 {
            0 => break,
            -1 => log::error!(
                "UiThread: GetMessageW failed: {}",
                windows::core::Error::from_win32()
            ),
            _ => {
                if !pre_translate_message(&context, &msg) {
                    unsafe {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    }
                }
            }
        }
    }

    // Normally already done by the queued teardown.
    context.teardown();
    unsafe { RoUninitialize() };
    log::debug!("UiThread: Message loop exited.");
}

fn init_xaml() -> PlatformResult<(WindowsXamlManager, DispatcherQueue)> {
    let manager = WindowsXamlManager::InitializeForCurrentThread().map_err(|e| {
        PlatformError::InitializationFailed(format!("Failed to create XAML manager: {e}"))
    })?;
    hide_core_window();
    let dispatcher = DispatcherQueue::GetForCurrentThread()?;
    Ok((manager, dispatcher))
}

// XAML creates an invisible core window for the thread, which can flash
// into the taskbar on some builds.
fn hide_core_window() {
    let handle = CoreWindow::GetForCurrentThread()
        .and_then(|window| window.cast::<ICoreWindowInterop>())
        .and_then(|interop| unsafe { interop.WindowHandle() });
    match handle {
        Ok(hwnd) => {
            let _ = unsafe { ShowWindow(hwnd, SW_HIDE) };
        }
        Err(e) => log::warn!("UiThread: Failed to get core window handle: {e}"),
    }
}

/*
 * XAML islands swallow Alt+F4 and Alt+Space, so those go straight to the
 * root window. Everything else is offered to the current island first.
 */
fn pre_translate_message(context: &UiContext, msg: &MSG) -> bool {
    if msg.message == WM_SYSKEYDOWN
        && (msg.wParam.0 == VK_F4.0 as usize || msg.wParam.0 == VK_SPACE.0 as usize)
    {
        Window(msg.hwnd)
            .ancestor(GA_ROOT)
            .send_message(msg.message, msg.wParam, msg.lParam);
        return true;
    }

    let Some(native) = context.native_source() else {
        return false;
    };
    let mut handled = BOOL(0);
    match unsafe { native.PreTranslateMessage(msg, &mut handled) }.ok() {
        Ok(()) => handled.as_bool(),
        Err(e) => {
            log::warn!("UiThread: Failed to pre-translate message: {e}");
            false
        }
    }
}
