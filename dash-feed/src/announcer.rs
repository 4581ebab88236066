//! Out-of-band error overlay announcements

use crate::streaming::messages::ErrorState;
use crate::telemetry::seeded_rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

/// Messages the dashboard is exercised with
pub const ERROR_MESSAGES: [&str; 5] = [
    "Critical System Error",
    "Connection Lost",
    "Battery Warning",
    "Motor Malfunction",
    "CAN Bus Error",
];

/// Picks the message for each raised error; clearing is [`ErrorState::cleared`]
pub struct ErrorAnnouncer {
    rng: SmallRng,
}

impl ErrorAnnouncer {
    /// Seed 0 draws from entropy
    pub fn new(seed: u64) -> Self {
        Self {
            rng: seeded_rng(seed),
        }
    }

    /// Raised error with a message picked from [`ERROR_MESSAGES`]
    pub fn raise(&mut self) -> ErrorState {
        let message = ERROR_MESSAGES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(ERROR_MESSAGES[0]);
        ErrorState::raised(message)
    }
}
