//! Gamepad lifecycle and the press/release loop
//!
//! ```text
//! Uninitialized -> DeviceCreated -> PublishingPath -> InjectingEvents -> Closed
//! ```
//!
//! Each step checks the current state and fails with
//! [`Error::InvalidState`] when called out of order. [`Injector::close`] is
//! accepted from any state and is idempotent.

use crate::device::{self, Backend, Button, DEVICE_NAME, VirtualDevice};
use crate::error::{Error, Result};
use crate::publisher::PathPublisher;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep before the shutdown flag is checked again
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Lifecycle state of the injector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectorState {
    Uninitialized,
    DeviceCreated,
    PublishingPath,
    InjectingEvents,
    Closed,
}

impl InjectorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::DeviceCreated => "DeviceCreated",
            Self::PublishingPath => "PublishingPath",
            Self::InjectingEvents => "InjectingEvents",
            Self::Closed => "Closed",
        }
    }
}

/// Press cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Time between press and release
    pub hold: Duration,
    /// Time between release and the next press
    pub gap: Duration,
}

impl Timing {
    pub fn from_millis(hold_ms: u64, gap_ms: u64) -> Self {
        Self {
            hold: Duration::from_millis(hold_ms),
            gap: Duration::from_millis(gap_ms),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from_millis(100, 400)
    }
}

pub struct Injector {
    state: InjectorState,
    button: Button,
    timing: Timing,
    device: Option<Box<dyn VirtualDevice>>,
    publisher: PathPublisher,
}

impl Injector {
    pub fn new(button: Button, path_file: impl Into<PathBuf>, timing: Timing) -> Self {
        Self {
            state: InjectorState::Uninitialized,
            button,
            timing,
            device: None,
            publisher: PathPublisher::new(path_file),
        }
    }

    pub fn state(&self) -> InjectorState {
        self.state
    }

    pub fn button(&self) -> Button {
        self.button
    }

    pub fn path_file(&self) -> &Path {
        self.publisher.path()
    }

    fn expect_state(&self, expected: InjectorState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    /// Create the gamepad on `backend`
    pub fn create_device(&mut self, backend: Backend) -> Result<()> {
        self.expect_state(InjectorState::Uninitialized)?;
        let device = device::create_device(backend, DEVICE_NAME)?;
        self.attach_device(device)
    }

    /// Use an already constructed device
    pub fn attach_device(&mut self, device: Box<dyn VirtualDevice>) -> Result<()> {
        self.expect_state(InjectorState::Uninitialized)?;
        self.device = Some(device);
        self.state = InjectorState::DeviceCreated;
        debug!("Injector state -> {}", self.state.as_str());
        Ok(())
    }

    /// Write the device node path to the path file
    pub fn publish_path(&mut self) -> Result<PathBuf> {
        self.expect_state(InjectorState::DeviceCreated)?;
        let device = self.device_mut()?;
        let dev_node = device.dev_node()?;
        self.publisher.publish(&dev_node)?;
        self.state = InjectorState::PublishingPath;
        debug!("Injector state -> {}", self.state.as_str());
        Ok(dev_node)
    }

    /// Press and release the button until `shutdown` is set, or until
    /// `max_cycles` presses have completed. Returns the number of completed
    /// press/release cycles. A press is always followed by its release.
    pub fn run(&mut self, shutdown: &AtomicBool, max_cycles: Option<u64>) -> Result<u64> {
        self.expect_state(InjectorState::PublishingPath)?;
        self.state = InjectorState::InjectingEvents;
        info!(
            "Injecting {:?} (code {:#x}) every {:?}",
            self.button,
            self.button.code(),
            self.timing.hold + self.timing.gap
        );

        let button = self.button;
        let timing = self.timing;
        let device = self.device_mut()?;
        let mut cycles = 0u64;

        while !shutdown.load(Ordering::Relaxed) {
            if max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            device.emit_button(button, true)?;
            sleep_unless(shutdown, timing.hold);
            device.emit_button(button, false)?;
            cycles += 1;

            if !sleep_unless(shutdown, timing.gap) {
                break;
            }
        }

        info!("Stopped after {} press(es)", cycles);
        Ok(cycles)
    }

    /// Close the device and delete the path file
    pub fn close(&mut self) -> Result<()> {
        if self.state == InjectorState::Closed {
            return Ok(());
        }
        self.device = None;
        self.state = InjectorState::Closed;
        self.publisher.remove()?;
        info!("Virtual gamepad closed");
        Ok(())
    }

    fn device_mut(&mut self) -> Result<&mut Box<dyn VirtualDevice>> {
        self.device
            .as_mut()
            .ok_or_else(|| Error::Other("no virtual device attached".to_string()))
    }
}

/// Sleep for `duration` in slices. Returns false if `shutdown` was set.
fn sleep_unless(shutdown: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
