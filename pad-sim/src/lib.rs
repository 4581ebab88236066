//! pad-sim - virtual gamepad for input-device testing
//!
//! Creates a two-button, two-axis gamepad through Linux uinput (or an
//! in-memory mock), publishes its `/dev/input/eventN` path to a well-known
//! file so the car controller can open it, and presses one button on a fixed
//! cadence until told to stop.

pub mod device;
pub mod error;
pub mod injector;
pub mod publisher;

pub use device::{Backend, Button, VirtualDevice, create_device};
pub use error::{Error, Result};
pub use injector::{Injector, InjectorState, Timing};
