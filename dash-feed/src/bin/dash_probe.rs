//! dash-probe - connect to a running feed and log every decoded field

use clap::Parser;
use dash_feed::error::Result;
use dash_feed::streaming::{FeedClient, FieldValue};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "dash-probe", about = "Decode and print a dashboard telemetry feed")]
struct Args {
    /// Feed address
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    address: String,

    /// Stop after this many fields (0 = until the feed closes)
    #[arg(short, long, default_value_t = 0)]
    count: usize,

    /// Connect timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,
}

fn format_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Int32(v) => v.to_string(),
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::Double(v) => format!("{:.2}", v),
        FieldValue::String(v) => format!("{:?}", v),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut client =
        FeedClient::connect_timeout(&args.address, Duration::from_millis(args.timeout_ms))?;
    log::info!(
        "Connected to {} from {}",
        client.peer_addr(),
        client.local_addr()?
    );

    let mut received = 0usize;
    while args.count == 0 || received < args.count {
        match client.recv_field()? {
            Some((name, value)) => {
                // Telemetry messages start with `speed`, error states with `showError`
                if name == "speed" || name == "showError" {
                    log::info!("---");
                }
                log::info!("{:>14} = {}", name, format_value(&value));
                received += 1;
            }
            None => {
                log::info!("Feed closed the connection");
                break;
            }
        }
    }

    log::info!("Received {} field(s)", received);
    Ok(())
}
