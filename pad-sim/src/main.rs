//! pad-sim - virtual gamepad that presses one button on a fixed cadence
//!
//! Usage: pad-sim <BUTTON> [--backend uinput|mock] [--path-file PATH]

use clap::Parser;
use log::{error, info};
use pad_sim::publisher::DEFAULT_PATH_FILE;
use pad_sim::{Backend, Button, Error, Injector, Result, Timing};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

#[derive(Parser, Debug)]
#[command(name = "pad-sim", about = "Inject periodic gamepad button presses")]
struct Args {
    /// "A" presses BTN_SOUTH; anything else presses BTN_EAST
    button: String,

    /// Device backend
    #[arg(long, value_enum, env = "PAD_SIM_BACKEND", default_value = "uinput")]
    backend: Backend,

    /// File the device node path is written to
    #[arg(long, default_value = DEFAULT_PATH_FILE)]
    path_file: PathBuf,

    /// Press duration in milliseconds
    #[arg(long, default_value_t = 100)]
    hold_ms: u64,

    /// Pause after release in milliseconds
    #[arg(long, default_value_t = 400)]
    gap_ms: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let button = Button::from_arg(&args.button);

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown)).map_err(Error::Signal)?;
    }

    info!(
        "Starting virtual gamepad ({:?} backend, button {:?})",
        args.backend, button
    );

    let mut injector = Injector::new(
        button,
        &args.path_file,
        Timing::from_millis(args.hold_ms, args.gap_ms),
    );

    let result = run(&mut injector, args.backend, &shutdown);
    if let Err(e) = &result {
        error!("{}", e);
    }

    info!("Cleaning up virtual gamepad...");
    let closed = injector.close();
    result.and(closed)
}

fn run(injector: &mut Injector, backend: Backend, shutdown: &AtomicBool) -> Result<()> {
    injector.create_device(backend)?;
    let node = injector.publish_path()?;
    info!(
        "Device node {} published to {}",
        node.display(),
        injector.path_file().display()
    );
    injector.run(shutdown, None)?;
    Ok(())
}
