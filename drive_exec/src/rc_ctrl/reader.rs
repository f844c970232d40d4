//! Thread driver for RC override control
//!
//! [`RcReader`] owns the receiver's line channel for the lifetime of the
//! loop and is the only thing that touches [`RcCtrl`] state. It shares
//! nothing with other threads except the chassis (behind its mutex) and the
//! cancellation flag.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

// Internal
use super::{InputData, OutputData, ProcError, RcCtrl};
use crate::chassis::{Chassis, ChassisError};
use util::module::State;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of lines discarded at startup to flush stale data out of the
/// receiver's transmit buffer.
const STARTUP_FLUSH_LINES: usize = 10;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Thread driver for the RC override loop.
pub struct RcReader<C: Chassis> {
    ctrl: RcCtrl,

    chassis: Arc<Mutex<C>>,

    cancel: Arc<AtomicBool>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error which terminates the RC override loop.
///
/// The loop performs no retries: a failed loop is dead and must be restarted
/// by its owner.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to read from the receiver: {0}")]
    Io(#[from] io::Error),

    #[error("RC control processing failed: {0}")]
    Proc(#[from] ProcError),

    #[error("Could not issue demands to the chassis: {0}")]
    Chassis(#[from] ChassisError),

    #[error("The chassis lock is poisoned")]
    LockPoisoned,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C: Chassis> RcReader<C> {
    /// Create a new reader around an initialised [`RcCtrl`].
    pub fn new(ctrl: RcCtrl, chassis: Arc<Mutex<C>>, cancel: Arc<AtomicBool>) -> Self {
        Self {
            ctrl,
            chassis,
            cancel,
        }
    }

    /// Run the override loop until cancellation or a terminal error.
    ///
    /// Each iteration performs one bounded line read, one cancellation
    /// check, one processing step and one dispatch, strictly in that order,
    /// so a stale demand is never issued after a newer sample has been read.
    /// The channel is dropped, and thereby closed, when this returns.
    pub fn run<R: BufRead>(mut self, mut channel: R) -> Result<(), RunError> {
        // The receiver free-runs, so whatever is sitting in its buffer when
        // we attach is stale. Discard a handful of lines before sampling.
        for _ in 0..STARTUP_FLUSH_LINES {
            if read_line(&mut channel)?.is_none() {
                break;
            }
        }

        // Radius limits are fixed chassis properties, read them once
        let (min_radius_m, max_radius_m) = {
            let chassis = self.chassis.lock().map_err(|_| RunError::LockPoisoned)?;
            (chassis.min_radius_m(), chassis.max_radius_m())
        };

        info!("RC override loop running");

        loop {
            // A pending read completes or times out before cancellation
            // takes effect; this bounds shutdown latency to one channel
            // timeout.
            let line = read_line(&mut channel)?;

            if self.cancel.load(Ordering::Relaxed) {
                break;
            }

            let input = InputData {
                line,
                now: Instant::now(),
                min_radius_m,
                max_radius_m,
            };

            let (output, _report) = self.ctrl.proc(&input)?;

            self.dispatch(&output)?;
        }

        info!("RC override loop cancelled, exiting");

        Ok(())
    }

    /// Apply one processing step's output to the chassis.
    fn dispatch(&self, output: &OutputData) -> Result<(), RunError> {
        let mut chassis = self.chassis.lock().map_err(|_| RunError::LockPoisoned)?;

        if chassis.rc_active() != output.rc_active {
            debug!("RC override {}", if output.rc_active { "asserted" } else { "released" });
        }
        chassis.set_rc_active(output.rc_active);

        if let Some(demand) = output.demand {
            chassis.ensure_ready()?;
            chassis.move_velocity_radius(demand.throttle_pct, demand.radius_m)?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Read one line from the channel, bounded by its configured timeout.
///
/// Returns `None` for an empty (timed out) read. Undecodable bytes are
/// treated like any other noise on the link: dropped.
fn read_line<R: BufRead>(channel: &mut R) -> Result<Option<String>, io::Error> {
    let mut line = String::new();

    match channel.read_line(&mut line) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(line)),
        Err(ref e)
            if e.kind() == io::ErrorKind::TimedOut
                || e.kind() == io::ErrorKind::WouldBlock
                || e.kind() == io::ErrorKind::InvalidData =>
        {
            Ok(None)
        }
        Err(e) => {
            warn!("Receiver read failed: {}", e);
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
