//! Message types sent to the dashboard
//!
//! Two logical messages share the unframed stream:
//! - Telemetry: 7 mandatory fields, plus `temperature` and `totalDistance`
//!   when present, always in catalogue order
//! - Error state: `showError`, plus `errorMessage` only when an error is raised

use crate::streaming::wire::{FieldValue, FrameWriter};

/// Number of name/value pairs in a telemetry message without extended fields
pub const TELEMETRY_BASE_FIELDS: usize = 7;

/// One generated vehicle state, regenerated every broadcast tick
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    /// km/h
    pub speed: i32,
    /// km/h
    pub speed_limit: i32,
    /// percent
    pub battery_level: i32,
    /// volts
    pub battery_voltage: i32,
    /// km
    pub battery_range: i32,
    pub motor_active: bool,
    /// percent of rated power, negative while regenerating
    pub motor_power: i32,
    /// °C
    pub temperature: Option<f64>,
    /// km
    pub total_distance: Option<f64>,
}

impl TelemetrySnapshot {
    /// Field names and values in wire order
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = vec![
            ("speed", FieldValue::Int32(self.speed)),
            ("speedLimit", FieldValue::Int32(self.speed_limit)),
            ("batteryLevel", FieldValue::Int32(self.battery_level)),
            ("batteryVoltage", FieldValue::Int32(self.battery_voltage)),
            ("batteryRange", FieldValue::Int32(self.battery_range)),
            ("motorActive", FieldValue::Bool(self.motor_active)),
            ("motorPower", FieldValue::Int32(self.motor_power)),
        ];
        if let Some(temperature) = self.temperature {
            fields.push(("temperature", FieldValue::Double(temperature)));
        }
        if let Some(total_distance) = self.total_distance {
            fields.push(("totalDistance", FieldValue::Double(total_distance)));
        }
        fields
    }
}

/// Error overlay state shown by the dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    pub show_error: bool,
    /// Only present while `show_error` is set
    pub error_message: Option<String>,
}

impl ErrorState {
    pub fn raised(message: impl Into<String>) -> Self {
        Self {
            show_error: true,
            error_message: Some(message.into()),
        }
    }

    pub fn cleared() -> Self {
        Self {
            show_error: false,
            error_message: None,
        }
    }
}

/// Anything that can be written to the dashboard as one logical message
pub trait Message {
    fn encode(&self, writer: &mut FrameWriter);

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = FrameWriter::with_capacity(256);
        self.encode(&mut writer);
        writer.take()
    }
}

impl Message for TelemetrySnapshot {
    fn encode(&self, writer: &mut FrameWriter) {
        for (name, value) in self.fields() {
            writer.write_field(name, &value);
        }
    }
}

impl Message for ErrorState {
    fn encode(&self, writer: &mut FrameWriter) {
        writer.write_field("showError", &FieldValue::Bool(self.show_error));
        if !self.show_error {
            return;
        }
        match self.error_message.as_deref() {
            Some(message) if !message.is_empty() => {
                writer.write_field("errorMessage", &FieldValue::String(message.to_string()));
            }
            _ => {}
        }
    }
}
