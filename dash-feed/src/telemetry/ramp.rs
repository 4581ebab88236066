//! Repeating drive cycle: 20 ticks accelerating, 20 ticks braking
//!
//! ```text
//! speed
//!  100 ┤        ╱╲
//!      │      ╱    ╲
//!    0 ┼────╱────────╲──── tick (mod 40)
//!      0        20       40
//! ```
//!
//! Motor power leads speed by 30% while accelerating and goes negative
//! (regeneration) while braking. Battery drains 1% every 2 ticks down to 20%.

use super::{Odometer, TEMPERATURE_RANGE, TelemetrySource};
use crate::streaming::messages::TelemetrySnapshot;
use rand::Rng;
use rand::rngs::SmallRng;

const CYCLE_TICKS: u64 = 40;
const HALF_CYCLE: u64 = CYCLE_TICKS / 2;
const SPEED_LIMIT_ROTATION: [i32; 5] = [30, 50, 80, 100, 120];
const NOMINAL_VOLTAGE: i32 = 48;
const MIN_BATTERY: i32 = 20;

pub struct RampSource {
    rng: SmallRng,
    odometer: Option<Odometer>,
    tick: u64,
}

impl RampSource {
    pub fn new(rng: SmallRng, odometer: Option<Odometer>) -> Self {
        Self {
            rng,
            odometer,
            tick: 0,
        }
    }

    /// (speed, motor power) at a position within the cycle
    fn drive_phase(cycle: u64) -> (i32, i32) {
        if cycle < HALF_CYCLE {
            let speed = (cycle * 100 / HALF_CYCLE) as i32;
            (speed, (speed + 30).min(100))
        } else {
            let speed = ((CYCLE_TICKS - cycle) * 100 / HALF_CYCLE) as i32;
            let regen = ((cycle - HALF_CYCLE) * 80 / HALF_CYCLE) as i32;
            (speed, (-regen).max(-100))
        }
    }
}

impl TelemetrySource for RampSource {
    fn next_snapshot(&mut self) -> TelemetrySnapshot {
        let t = self.tick;
        self.tick += 1;

        let (speed, motor_power) = Self::drive_phase(t % CYCLE_TICKS);
        let battery_level = 100i32.saturating_sub((t / 2).min(100) as i32).max(MIN_BATTERY);
        let battery_voltage = NOMINAL_VOLTAGE + self.rng.gen_range(-2..=2);
        let speed_limit =
            SPEED_LIMIT_ROTATION[((t / HALF_CYCLE) % SPEED_LIMIT_ROTATION.len() as u64) as usize];

        let (temperature, total_distance) = match self.odometer.as_mut() {
            Some(odometer) => {
                let heat = 20.0 + f64::from(motor_power.abs()) * 0.15;
                let jitter = self.rng.gen_range(-0.5..=0.5);
                (
                    Some((heat + jitter).clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end())),
                    Some(odometer.advance(speed)),
                )
            }
            None => (None, None),
        };

        TelemetrySnapshot {
            speed,
            speed_limit,
            battery_level,
            battery_voltage,
            battery_range: battery_level * 3,
            motor_active: speed > 0 || motor_power != 0,
            motor_power,
            temperature,
            total_distance,
        }
    }
}
