#[cfg(windows)]
use windows::core::Error as WinError;

// Represents errors that can occur within the platform abstraction layer.
//
// This enum centralizes error handling for the native side: the XAML thread,
// the tray icon, window introspection and taskbar composition. Most of these
// are logged where they are raised and then surface as a degraded feature
// rather than a failed run.
#[derive(Debug, Clone)]
pub enum PlatformError {
    /// An error originating from the Windows API.
    #[cfg(windows)]
    Win32(WinError),
    /// Failure during the initialization of the platform layer or its components.
    InitializationFailed(String),
    /// A requested operation could not be completed.
    OperationFailed(String),
    /// The native side only exists on Windows.
    UnsupportedPlatform,
}

#[cfg(windows)]
impl From<WinError> for PlatformError {
    fn from(err: WinError) -> Self {
        PlatformError::Win32(err)
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(windows)]
            PlatformError::Win32(e) => write!(f, "Win32 Error: {e}"),
            PlatformError::InitializationFailed(s) => write!(f, "Initialization Failed: {s}"),
            PlatformError::OperationFailed(s) => write!(f, "Operation Failed: {s}"),
            PlatformError::UnsupportedPlatform => {
                write!(f, "This application only runs on Windows")
            }
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(windows)]
            PlatformError::Win32(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized `Result` type for platform layer operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
