//! Error types for the dashboard feed

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Dashboard feed error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be written
    #[error("Config serialization error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Listener could not be bound
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Malformed or unexpected bytes on the wire
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
