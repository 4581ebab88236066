//! Uniform random telemetry, one independent draw per tick

use super::{
    BATTERY_LEVEL_RANGE, BATTERY_RANGE_RANGE, BATTERY_VOLTAGE_RANGE, MOTOR_POWER_RANGE, Odometer,
    SPEED_LIMITS, SPEED_RANGE, TEMPERATURE_RANGE, TelemetrySource,
};
use crate::streaming::messages::TelemetrySnapshot;
use rand::prelude::*;
use rand::rngs::SmallRng;

pub struct RandomSource {
    rng: SmallRng,
    odometer: Option<Odometer>,
}

impl RandomSource {
    /// `odometer` enables the extended fields (temperature, total distance)
    pub fn new(rng: SmallRng, odometer: Option<Odometer>) -> Self {
        Self { rng, odometer }
    }
}

impl TelemetrySource for RandomSource {
    fn next_snapshot(&mut self) -> TelemetrySnapshot {
        let speed = self.rng.gen_range(SPEED_RANGE);
        let speed_limit = *SPEED_LIMITS.choose(&mut self.rng).unwrap_or(&SPEED_LIMITS[0]);
        let battery_level = self.rng.gen_range(BATTERY_LEVEL_RANGE);
        let battery_voltage = self.rng.gen_range(BATTERY_VOLTAGE_RANGE);
        let battery_range = self.rng.gen_range(BATTERY_RANGE_RANGE);
        let motor_active = self.rng.gen_bool(0.5);
        let motor_power = if motor_active {
            self.rng.gen_range(MOTOR_POWER_RANGE)
        } else {
            0
        };

        let (temperature, total_distance) = match self.odometer.as_mut() {
            Some(odometer) => (
                Some(self.rng.gen_range(TEMPERATURE_RANGE)),
                Some(odometer.advance(speed)),
            ),
            None => (None, None),
        };

        TelemetrySnapshot {
            speed,
            speed_limit,
            battery_level,
            battery_voltage,
            battery_range,
            motor_active,
            motor_power,
            temperature,
            total_distance,
        }
    }
}
