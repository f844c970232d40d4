//! Parameters structure for the chassis

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use mctrl_if::device::AddressConfig;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the bus-backed chassis.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- CAPABILITIES ----
    /// The tightest turn radius the steering geometry can achieve.
    ///
    /// Units: meters
    pub min_radius_m: f64,

    /// The widest turn radius treated as an actual turn rather than
    /// straight travel.
    ///
    /// Units: meters
    pub max_radius_m: f64,

    // ---- GEOMETRY ----
    /// One entry per wheel station.
    pub wheels: Vec<WheelConfig>,
}

/// Configuration of a single wheel station.
#[derive(Debug, Clone, Deserialize)]
pub struct WheelConfig {
    /// Human readable wheel name, used in logs and errors ("FL", "MR", ...).
    pub name: String,

    /// Position of the wheel contact point in the body frame, x forwards
    /// and y towards the turn centre for a positive-radius (right) turn.
    ///
    /// Units: meters,
    /// Frame: Rover body
    pub pos_m_rb: [f64; 2],

    /// Bus address of the wheel's steer servo controller.
    pub steer: AddressConfig,

    /// Bus address of the wheel's drive motor controller.
    pub drive: AddressConfig,
}
