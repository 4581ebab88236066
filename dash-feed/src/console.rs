//! Operator commands read line by line from standard input
//!
//! | Input | Command |
//! |-------|---------|
//! | `e` | Raise an error overlay |
//! | `c` | Clear the error overlay |
//! | `q` | Quit |

use crate::error::{Error, Result};
use crossbeam_channel::Sender;
use log::{debug, warn};
use std::io::BufRead;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    RaiseError,
    ClearError,
    Quit,
}

impl OperatorCommand {
    /// Parse one input line; case and surrounding whitespace are ignored
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "e" => Some(Self::RaiseError),
            "c" => Some(Self::ClearError),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Forward every recognised line of `input` to `tx` until EOF or the receiver hangs up
pub fn forward_commands<R: BufRead>(input: R, tx: &Sender<OperatorCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read operator input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match OperatorCommand::parse(&line) {
            Some(cmd) => {
                if tx.send(cmd).is_err() {
                    break;
                }
            }
            None => warn!("Unknown command {:?} (use e, c or q)", line.trim()),
        }
    }
    debug!("Operator input closed");
}

/// Spawn a thread that reads stdin and forwards commands
///
/// The thread blocks on stdin and is not joined on shutdown.
pub fn spawn_stdin_reader(tx: Sender<OperatorCommand>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("operator-console".to_string())
        .spawn(move || forward_commands(std::io::stdin().lock(), &tx))
        .map_err(|e| Error::Other(format!("Failed to spawn console thread: {}", e)))
}
