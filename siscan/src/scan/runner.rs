//! Event loop for a sweep.

use std::time::Duration;

use log::warn;
use tokio::sync::mpsc;

use super::multi::{MultiScanner, ScanOptions, SweepStatus};
use super::receiver::{Receiver, ScanEvent};
use crate::error::ScanError;

/// How long the loop waits for any event before declaring a stall.
pub fn stall_timeout(options: &ScanOptions) -> Duration {
    options.tune_timeout.max(options.filter_timeout) + Duration::from_secs(1)
}

/// Run a sweep to completion, feeding it events from `events`.
///
/// The receiver behind `scanner` is expected to post its lock and section
/// events to the sending half of `events`. If nothing arrives within
/// `stall`, the scanner is told so and moves on.
pub async fn run_sweep<R: Receiver>(
    scanner: &mut MultiScanner<R>,
    events: &mut mpsc::UnboundedReceiver<ScanEvent>,
    stall: Duration,
) -> Result<SweepStatus, ScanError> {
    scanner.start()?;
    while !scanner.is_finished() {
        match tokio::time::timeout(stall, events.recv()).await {
            Ok(Some(event)) => scanner.handle_event(event)?,
            Ok(None) => {
                warn!("Sweep: event source closed");
                scanner.cancel();
            }
            Err(_) => scanner.on_stall()?,
        }
    }
    Ok(scanner.status())
}
