//! Parameters structure for RcCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for RC override control.
///
/// The defaults match the receiver flown on the rover (1500 us centre pulse,
/// 500 us full deflection); parameter files need only override what differs.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// The receiver's physical centre pulse width. Channel readings are
    /// neutral-centred by subtracting this.
    ///
    /// Units: microseconds
    #[serde(default = "default_centre_pulse_us")]
    pub centre_pulse_us: f64,

    /// Pulse width change per percent of stick deflection.
    ///
    /// Units: microseconds/percent
    #[serde(default = "default_stick_scale_us_per_pct")]
    pub stick_scale_us_per_pct: f64,

    /// Minimum time between accepted samples. Lines arriving faster than
    /// this are discarded so the chassis is never driven faster than it can
    /// react.
    ///
    /// Units: seconds
    #[serde(default = "default_debounce_s")]
    pub debounce_s: f64,

    /// Time without an override-enabling sample after which override mode is
    /// forced off, guarding against a wedged receiver holding the last
    /// asserted value after link loss.
    ///
    /// Units: seconds
    #[serde(default = "default_override_timeout_s")]
    pub override_timeout_s: f64,

    /// Steering dead-zone half width. Deflections inside it command straight
    /// travel (infinite turn radius).
    ///
    /// Units: percent
    #[serde(default = "default_steer_deadzone_pct")]
    pub steer_deadzone_pct: f64,

    /// Throttle dead-zone half width. Deflections inside it snap to zero.
    ///
    /// Units: percent
    #[serde(default = "default_throttle_deadzone_pct")]
    pub throttle_deadzone_pct: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            centre_pulse_us: default_centre_pulse_us(),
            stick_scale_us_per_pct: default_stick_scale_us_per_pct(),
            debounce_s: default_debounce_s(),
            override_timeout_s: default_override_timeout_s(),
            steer_deadzone_pct: default_steer_deadzone_pct(),
            throttle_deadzone_pct: default_throttle_deadzone_pct(),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_centre_pulse_us() -> f64 {
    1500.0
}

fn default_stick_scale_us_per_pct() -> f64 {
    5.0
}

fn default_debounce_s() -> f64 {
    0.05
}

fn default_override_timeout_s() -> f64 {
    2.0
}

fn default_steer_deadzone_pct() -> f64 {
    6.0
}

fn default_throttle_deadzone_pct() -> f64 {
    5.0
}
