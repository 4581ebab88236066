//! TCP streaming module for the dashboard feed

pub mod broadcaster;
pub mod client;
pub mod messages;
pub mod registry;
pub mod wire;

pub use broadcaster::Broadcaster;
pub use client::FeedClient;
pub use messages::{ErrorState, Message, TelemetrySnapshot};
pub use registry::{BroadcastReport, ClientConnection, ClientRegistry, ClientStream};
pub use wire::{FieldType, FieldValue, FrameReader, FrameWriter};
