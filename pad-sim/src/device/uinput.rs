//! Kernel-backed gamepad through `/dev/uinput`

use super::{AXIS_MAX, AXIS_MIN, Button, VirtualDevice};
use crate::error::{Error, Result};
use evdev::uinput::{VirtualDevice as EvdevDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use log::{info, warn};
use std::io;
use std::path::PathBuf;

const PERMISSION_HINT: &str = "Try one of:\n  \
    - sudo modprobe uinput\n  \
    - sudo chmod 0660 /dev/uinput && sudo chgrp input /dev/uinput, then add your user to 'input'\n  \
    - run with --backend mock";

const VENDOR_ID: u16 = 0x1234;
const PRODUCT_ID: u16 = 0x5678;
const VERSION: u16 = 1;

pub struct UinputDevice {
    device: EvdevDevice,
    dev_node: Option<PathBuf>,
}

impl UinputDevice {
    /// Register a gamepad with BTN_SOUTH, BTN_EAST, ABS_X and ABS_Y
    pub fn create(name: &str) -> Result<Self> {
        let builder = VirtualDeviceBuilder::new().map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                Error::PermissionDenied {
                    hint: PERMISSION_HINT,
                    source: e,
                }
            } else {
                Error::Io(e)
            }
        })?;

        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_SOUTH);
        keys.insert(Key::BTN_EAST);

        let axis_info = AbsInfo::new(0, AXIS_MIN, AXIS_MAX, 0, 0, 0);
        let abs_x = UinputAbsSetup::new(AbsoluteAxisType::ABS_X, axis_info);
        let abs_y = UinputAbsSetup::new(AbsoluteAxisType::ABS_Y, axis_info);

        let device = builder
            .name(name)
            .input_id(InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, VERSION))
            .with_keys(&keys)?
            .with_absolute_axis(&abs_x)?
            .with_absolute_axis(&abs_y)?
            .build()?;

        info!("Created uinput device {:?}", name);
        Ok(Self {
            device,
            dev_node: None,
        })
    }

    fn key_for(button: Button) -> Key {
        match button {
            Button::A => Key::BTN_SOUTH,
            Button::B => Key::BTN_EAST,
        }
    }
}

impl VirtualDevice for UinputDevice {
    fn dev_node(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.dev_node {
            return Ok(path.clone());
        }

        // Blocks until udev has created the node
        let path = self
            .device
            .enumerate_dev_nodes_blocking()?
            .next()
            .ok_or_else(|| Error::Other("uinput device has no event node".to_string()))??;
        self.dev_node = Some(path.clone());
        Ok(path)
    }

    fn emit_button(&mut self, button: Button, pressed: bool) -> Result<()> {
        let event = InputEvent::new(
            EventType::KEY,
            Self::key_for(button).code(),
            i32::from(pressed),
        );
        // emit() appends SYN_REPORT
        self.device.emit(&[event])?;
        Ok(())
    }
}

impl Drop for UinputDevice {
    fn drop(&mut self) {
        match &self.dev_node {
            Some(path) => info!("Closing uinput device {}", path.display()),
            None => warn!("Closing uinput device before its node was published"),
        }
    }
}
