//! dash-feed - simulated vehicle telemetry for the dashboard
//!
//! Listens on `127.0.0.1:8888` (or the address in an optional TOML config)
//! and streams one telemetry snapshot every 500ms to every connected client.
//!
//! Operator commands on stdin: `e` raise error, `c` clear error, `q` quit.

use dash_feed::app::FeedApp;
use dash_feed::config::AppConfig;
use dash_feed::console::spawn_stdin_reader;
use dash_feed::error::{Error, Result};
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Optional positional config path; no flags
fn parse_config_path() -> Option<String> {
    env::args().nth(1).filter(|arg| !arg.starts_with('-'))
}

fn main() -> Result<()> {
    let config = match parse_config_path() {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("dash-feed v{} starting...", env!("CARGO_PKG_VERSION"));

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let mut app = match FeedApp::new(&config, Arc::clone(&running)) {
        Ok(app) => app,
        Err(e) => {
            log::error!("{}", e);
            log::error!("Make sure no other process is using this port!");
            return Err(e);
        }
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    spawn_stdin_reader(tx)?;

    app.run(rx)?;

    log::info!("dash-feed stopped");
    Ok(())
}
