//! Dashboard feed - simulated vehicle telemetry over TCP
//!
//! Broadcasts generated speed, battery and motor telemetry to any number of
//! connected dashboards using Qt's `QDataStream` wire format, and pushes
//! error-overlay states on operator request.
//!
//! ## Binaries
//!
//! - `dash-feed`: the broadcaster (`127.0.0.1:8888`, one snapshot every 500ms)
//! - `dash-probe`: connects to a feed and logs every decoded field

pub mod announcer;
pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod streaming;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
