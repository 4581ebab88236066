//! Virtual input device backends
//!
//! | Backend | Implementation |
//! |---------|----------------|
//! | `uinput` | Real kernel device via `/dev/uinput` (Linux only) |
//! | `mock` | In-memory recorder for tests and machines without uinput |
//!
//! The backend is chosen by the caller and passed to [`create_device`];
//! nothing below this module looks at the environment.

pub mod mock;
#[cfg(target_os = "linux")]
pub mod uinput;

pub use mock::{MockDevice, MockEvent};

use crate::error::Result;
use std::path::PathBuf;

/// Name the device registers with
pub const DEVICE_NAME: &str = "VirtualPhoneGamepad";

/// Absolute axis range for ABS_X / ABS_Y
pub const AXIS_MIN: i32 = -32768;
pub const AXIS_MAX: i32 = 32767;

/// Linux input key codes
const BTN_SOUTH: u16 = 0x130;
const BTN_EAST: u16 = 0x131;

/// Digital buttons exposed by the gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// BTN_SOUTH
    A,
    /// BTN_EAST
    B,
}

impl Button {
    /// `"A"` selects A; any other value selects B
    pub fn from_arg(arg: &str) -> Self {
        if arg == "A" { Self::A } else { Self::B }
    }

    /// Linux input event code
    pub fn code(self) -> u16 {
        match self {
            Self::A => BTN_SOUTH,
            Self::B => BTN_EAST,
        }
    }
}

/// Device backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    #[default]
    Uinput,
    Mock,
}

/// Capability set of a virtual gamepad
pub trait VirtualDevice {
    /// OS-assigned path consumers open to read events
    fn dev_node(&mut self) -> Result<PathBuf>;

    /// Emit one key event followed by a synchronization report
    fn emit_button(&mut self, button: Button, pressed: bool) -> Result<()>;
}

/// Create a device on the selected backend
pub fn create_device(backend: Backend, name: &str) -> Result<Box<dyn VirtualDevice>> {
    match backend {
        Backend::Mock => Ok(Box::new(MockDevice::new(name))),
        #[cfg(target_os = "linux")]
        Backend::Uinput => Ok(Box::new(uinput::UinputDevice::create(name)?)),
        #[cfg(not(target_os = "linux"))]
        Backend::Uinput => Err(crate::error::Error::NotSupported(
            "uinput backend requires Linux (use --backend mock)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_selection() {
        assert_eq!(Button::from_arg("A"), Button::A);
        assert_eq!(Button::from_arg("B"), Button::B);
        assert_eq!(Button::from_arg("a"), Button::B);
        assert_eq!(Button::from_arg(""), Button::B);
    }

    #[test]
    fn test_button_codes() {
        assert_eq!(Button::A.code(), 304);
        assert_eq!(Button::B.code(), 305);
    }

    #[test]
    fn test_mock_backend() {
        let mut device = create_device(Backend::Mock, DEVICE_NAME).unwrap();
        assert!(device.dev_node().unwrap().starts_with("/dev/input"));
        device.emit_button(Button::A, true).unwrap();
    }
}
