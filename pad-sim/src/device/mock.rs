//! In-memory gamepad that records every emitted event

use super::{Button, VirtualDevice};
use crate::error::Result;
use log::debug;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// Event as it would have been written to the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    /// EV_KEY with value 1 (press) or 0 (release)
    Key { code: u16, value: i32 },
    /// EV_SYN / SYN_REPORT
    Sync,
}

pub struct MockDevice {
    name: String,
    path: PathBuf,
    events: Arc<Mutex<Vec<MockEvent>>>,
}

impl MockDevice {
    pub fn new(name: &str) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let path = PathBuf::from(format!("/dev/input/mock-event{}", id));
        debug!("Mock device {:?} created at {}", name, path.display());
        Self {
            name: name.to_string(),
            path,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the recorded events, valid after the device is dropped
    pub fn events(&self) -> Arc<Mutex<Vec<MockEvent>>> {
        Arc::clone(&self.events)
    }
}

impl VirtualDevice for MockDevice {
    fn dev_node(&mut self) -> Result<PathBuf> {
        Ok(self.path.clone())
    }

    fn emit_button(&mut self, button: Button, pressed: bool) -> Result<()> {
        let mut events = self.events.lock();
        events.push(MockEvent::Key {
            code: button.code(),
            value: i32::from(pressed),
        });
        events.push(MockEvent::Sync);
        Ok(())
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        debug!("Mock device {:?} closed", self.name);
    }
}
