//! Parameters structure for the drive executive

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive executive.
///
/// Only the RC receiver link is configured here; the motor controller bus is
/// configured in the bus parameter file shared with the operator tooling,
/// and everything behind it (controller scaling, chassis geometry, RC
/// thresholds) lives in the per-module parameter files.
#[derive(Debug, Deserialize)]
pub struct DriveExecParams {
    /// Serial device path of the RC receiver telemetry stream.
    pub rc_port: String,

    /// Baud rate of the RC receiver telemetry stream.
    pub rc_baud: u32,

    /// Read timeout applied to RC telemetry line reads. This bounds how
    /// stale a cancellation request can go unnoticed.
    ///
    /// Units: seconds
    pub rc_timeout_s: f64,
}
