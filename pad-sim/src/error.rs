//! Error types for the virtual gamepad

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Virtual gamepad error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The uinput device node could not be opened
    #[error("Permission denied creating virtual device: {source}\n{hint}")]
    PermissionDenied {
        /// What to try next
        hint: &'static str,
        /// Underlying open error
        source: std::io::Error,
    },

    /// Operation called in the wrong lifecycle state
    #[error("Invalid state: expected {expected}, was {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Signal handler could not be installed
    #[error("Failed to register signal handler: {0}")]
    Signal(#[source] std::io::Error),

    /// Backend not available on this platform
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
