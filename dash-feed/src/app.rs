//! Application orchestration for the dashboard feed
//!
//! Binds the broadcaster, starts the telemetry tick, and dispatches operator
//! commands until quit or a shutdown signal.

use crate::announcer::ErrorAnnouncer;
use crate::config::AppConfig;
use crate::console::OperatorCommand;
use crate::error::Result;
use crate::streaming::{Broadcaster, ErrorState};
use crate::telemetry::create_source;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How often the command loop re-checks the running flag
const COMMAND_POLL: Duration = Duration::from_millis(100);

/// Main application structure that owns the broadcaster
pub struct FeedApp {
    broadcaster: Broadcaster,
    announcer: ErrorAnnouncer,
    running: Arc<AtomicBool>,
}

impl FeedApp {
    /// Bind the listener and start broadcasting
    ///
    /// A bind failure is returned to the caller and is fatal for the daemon.
    pub fn new(config: &AppConfig, running: Arc<AtomicBool>) -> Result<Self> {
        let mut broadcaster = Broadcaster::bind(&config.network)?;
        broadcaster.start_ticks(
            create_source(&config.broadcast),
            config.broadcast.tick_period(),
        )?;

        let seed = config.broadcast.random_seed;
        Ok(Self {
            broadcaster,
            // Offset so a fixed seed does not pick messages in lockstep with telemetry
            announcer: ErrorAnnouncer::new(if seed == 0 { 0 } else { seed.wrapping_add(1) }),
            running,
        })
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Apply one operator command; returns false when the app should quit
    pub fn handle(&mut self, command: OperatorCommand) -> bool {
        match command {
            OperatorCommand::RaiseError => {
                let state = self.announcer.raise();
                self.broadcaster.announce(&state);
                true
            }
            OperatorCommand::ClearError => {
                self.broadcaster.announce(&ErrorState::cleared());
                true
            }
            OperatorCommand::Quit => {
                info!("Quit requested by operator");
                false
            }
        }
    }

    /// Process commands until quit, signal, or the command source closes
    pub fn run(&mut self, commands: Receiver<OperatorCommand>) -> Result<()> {
        info!("Commands: e = raise error, c = clear error, q = quit");

        while self.running.load(Ordering::Relaxed) {
            match commands.recv_timeout(COMMAND_POLL) {
                Ok(command) => {
                    if !self.handle(command) {
                        self.running.store(false, Ordering::Relaxed);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // stdin closed: keep streaming until a signal arrives
                    std::thread::sleep(COMMAND_POLL);
                }
            }
        }

        info!("Shutting down telemetry feed...");
        self.broadcaster.stop();
        Ok(())
    }
}
