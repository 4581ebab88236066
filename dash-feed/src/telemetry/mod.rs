//! Telemetry generators
//!
//! A [`TelemetrySource`] produces one [`TelemetrySnapshot`] per broadcast
//! tick. Two strategies exist:
//!
//! | Source | Behaviour |
//! |--------|-----------|
//! | `random` | Independent uniform draws within the field ranges below |
//! | `ramp` | Deterministic 40-tick accelerate/brake cycle with battery drain |
//!
//! Both take a seed; 0 means fresh entropy each run.

mod ramp;
mod random;

pub use ramp::RampSource;
pub use random::RandomSource;

use crate::config::{BroadcastConfig, SourceKind};
use crate::streaming::messages::TelemetrySnapshot;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::ops::RangeInclusive;

pub const SPEED_RANGE: RangeInclusive<i32> = 0..=180;
pub const SPEED_LIMITS: [i32; 4] = [30, 50, 80, 120];
pub const BATTERY_LEVEL_RANGE: RangeInclusive<i32> = 20..=100;
pub const BATTERY_VOLTAGE_RANGE: RangeInclusive<i32> = 44..=52;
pub const BATTERY_RANGE_RANGE: RangeInclusive<i32> = 50..=400;
pub const MOTOR_POWER_RANGE: RangeInclusive<i32> = 0..=100;
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 15.0..=45.0;

/// Produces telemetry snapshots for the broadcast loop
pub trait TelemetrySource: Send {
    fn next_snapshot(&mut self) -> TelemetrySnapshot;
}

/// Create the source selected by configuration
pub fn create_source(config: &BroadcastConfig) -> Box<dyn TelemetrySource> {
    let rng = seeded_rng(config.random_seed);
    let odometer = config
        .extended_fields
        .then(|| Odometer::new(config.tick_period().as_secs_f64()));
    match config.source {
        SourceKind::Random => Box::new(RandomSource::new(rng, odometer)),
        SourceKind::Ramp => Box::new(RampSource::new(rng, odometer)),
    }
}

/// Accumulates distance from the speed reported each tick
#[derive(Debug, Clone)]
pub struct Odometer {
    tick_hours: f64,
    total_km: f64,
}

impl Odometer {
    pub fn new(tick_secs: f64) -> Self {
        Self {
            tick_hours: tick_secs / 3600.0,
            total_km: 0.0,
        }
    }

    /// Advance by one tick at `speed` km/h and return the new total
    pub fn advance(&mut self, speed: i32) -> f64 {
        self.total_km += f64::from(speed.max(0)) * self.tick_hours;
        self.total_km
    }
}

pub(crate) fn seeded_rng(seed: u64) -> SmallRng {
    if seed == 0 {
        SmallRng::from_entropy()
    } else {
        SmallRng::seed_from_u64(seed)
    }
}
