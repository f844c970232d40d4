//! # Chassis abstraction
//!
//! The chassis is the single shared collaborator between motion sources:
//! the RC override loop and any autonomous or operator command path all
//! drive the vehicle through this interface, and nothing else. Callers from
//! multiple threads must share a chassis behind a mutex, the chassis itself
//! performs no locking.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod bus_chassis;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use bus_chassis::*;
pub use params::*;

use mctrl_if::controller::ControllerError;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Interface to the vehicle's motion hardware.
pub trait Chassis: Send {
    /// Idempotent readiness check. The first call wakes and verifies the
    /// hardware; later calls are free.
    fn ensure_ready(&mut self) -> Result<(), ChassisError>;

    /// Drive the vehicle at the given throttle along the given turn radius.
    ///
    /// An infinite radius of either sign is straight travel. A zero throttle
    /// with an infinite radius brings the vehicle to a stop.
    fn move_velocity_radius(&mut self, throttle_pct: f64, radius_m: f64)
        -> Result<(), ChassisError>;

    /// The tightest turn radius the vehicle can achieve.
    ///
    /// Units: meters
    fn min_radius_m(&self) -> f64;

    /// The widest finite turn radius the vehicle distinguishes from straight
    /// travel.
    ///
    /// Units: meters
    fn max_radius_m(&self) -> f64;

    /// Publish whether the RC transmitter currently holds manual override.
    /// Other motion sources observe this and yield while it is set.
    fn set_rc_active(&mut self, active: bool);

    /// Whether the RC transmitter currently holds manual override.
    fn rc_active(&self) -> bool;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised by a chassis operation.
#[derive(Debug, thiserror::Error)]
pub enum ChassisError {
    #[error("Controller error on device {addr}: {source}")]
    Controller {
        addr: u8,
        #[source]
        source: ControllerError,
    },
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test_chassis {
    use super::*;

    /// A chassis stub which records every call made against it.
    pub struct StubChassis {
        pub calls: Vec<StubCall>,
        pub min_radius_m: f64,
        pub max_radius_m: f64,
        rc_active: bool,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum StubCall {
        EnsureReady,
        Move { throttle_pct: f64, radius_m: f64 },
    }

    impl StubChassis {
        pub fn new(min_radius_m: f64, max_radius_m: f64) -> Self {
            Self {
                calls: Vec::new(),
                min_radius_m,
                max_radius_m,
                rc_active: false,
            }
        }
    }

    impl Chassis for StubChassis {
        fn ensure_ready(&mut self) -> Result<(), ChassisError> {
            self.calls.push(StubCall::EnsureReady);
            Ok(())
        }

        fn move_velocity_radius(
            &mut self,
            throttle_pct: f64,
            radius_m: f64,
        ) -> Result<(), ChassisError> {
            self.calls.push(StubCall::Move {
                throttle_pct,
                radius_m,
            });
            Ok(())
        }

        fn min_radius_m(&self) -> f64 {
            self.min_radius_m
        }

        fn max_radius_m(&self) -> f64 {
            self.max_radius_m
        }

        fn set_rc_active(&mut self, active: bool) {
            self.rc_active = active;
        }

        fn rc_active(&self) -> bool {
            self.rc_active
        }
    }
}
