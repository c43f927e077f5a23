/*
 * The native side of the application. `types` and `error` are shared with the
 * application logic and compile everywhere; the modules that talk to Win32,
 * WinRT and XAML only exist on Windows.
 */
pub mod error;
pub mod types;

#[cfg(windows)]
pub mod app;
#[cfg(windows)]
pub(crate) mod flyout;
#[cfg(windows)]
pub mod package;
#[cfg(windows)]
pub(crate) mod taskbar;
#[cfg(windows)]
pub(crate) mod tray_icon;
#[cfg(windows)]
pub mod ui_thread;
#[cfg(windows)]
pub mod window;
#[cfg(windows)]
pub(crate) mod xaml;

#[cfg(windows)]
pub use app::PlatformInterface;
pub use error::{PlatformError, Result as PlatformResult};
pub use types::{AppEvent, EnvironmentInfo, PlatformCommand, PlatformEventHandler};
