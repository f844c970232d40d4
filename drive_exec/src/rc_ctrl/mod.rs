//! # RC override control module
//!
//! This module continuously samples the RC receiver's telemetry stream and
//! arbitrates between manual override and autonomous/idle modes, issuing
//! steering-radius/throttle demands to the chassis while a human holds
//! override.
//!
//! The module is split into a pure state machine ([`RcCtrl`], which owns the
//! debounce, mode, dead-zone and stop-latch logic) and a thread driver
//! ([`RcReader`], which owns the line channel, the cancellation flag and the
//! shared chassis). Malformed telemetry lines are expected noise on this
//! link and are discarded silently, never raised as errors.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod frame;
mod params;
mod reader;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use frame::*;
pub use params::*;
pub use reader::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during RcCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Failed to load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Could not compile the telemetry line pattern: {0}")]
    LinePatternError(regex::Error),
}

/// Possible errors that can occur during RcCtrl processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcError {
    #[error("RC control has not been initialised")]
    NotInitialised,
}
