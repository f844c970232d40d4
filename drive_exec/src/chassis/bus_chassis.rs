//! [`Chassis`] implementation over the motor controller bus

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use std::convert::TryFrom;

// Internal
use super::{Chassis, ChassisError, Params};
use mctrl_if::controller::MotorController;
use mctrl_if::device::{DeviceAddress, DeviceClass};
use mctrl_if::ValidationError;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A chassis whose wheel stations are steer servo / drive motor pairs on the
/// motor controller bus.
pub struct BusChassis<K: MotorController> {
    controller: K,

    wheels: Vec<Wheel>,

    min_radius_m: f64,
    max_radius_m: f64,

    ready: bool,
    rc_active: bool,
}

/// A validated wheel station.
struct Wheel {
    name: String,
    pos_x_m: f64,
    pos_y_m: f64,
    steer: DeviceAddress,
    drive: DeviceAddress,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors constructing a [`BusChassis`].
#[derive(Debug, thiserror::Error)]
pub enum ChassisInitError {
    #[error("Wheel {name} has an invalid {role} address: {source}")]
    InvalidAddress {
        name: String,
        role: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error("Radius limits are invalid: min {min_radius_m} m, max {max_radius_m} m")]
    InvalidRadiusLimits { min_radius_m: f64, max_radius_m: f64 },

    #[error("The chassis has no wheels configured")]
    NoWheels,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<K: MotorController> BusChassis<K> {
    /// Build a chassis over the given controller.
    ///
    /// Every device address in the parameters is validated here, once, so
    /// that commanding never has to re-check them.
    pub fn new(controller: K, params: Params) -> Result<Self, ChassisInitError> {
        if params.wheels.is_empty() {
            return Err(ChassisInitError::NoWheels);
        }

        if !(params.min_radius_m > 0.0 && params.max_radius_m > params.min_radius_m) {
            return Err(ChassisInitError::InvalidRadiusLimits {
                min_radius_m: params.min_radius_m,
                max_radius_m: params.max_radius_m,
            });
        }

        let mut wheels = Vec::with_capacity(params.wheels.len());

        for wheel in &params.wheels {
            let steer = DeviceAddress::try_from(wheel.steer).map_err(|source| {
                ChassisInitError::InvalidAddress {
                    name: wheel.name.clone(),
                    role: "steer",
                    source,
                }
            })?;
            let drive = DeviceAddress::try_from(wheel.drive).map_err(|source| {
                ChassisInitError::InvalidAddress {
                    name: wheel.name.clone(),
                    role: "drive",
                    source,
                }
            })?;

            wheels.push(Wheel {
                name: wheel.name.clone(),
                pos_x_m: wheel.pos_m_rb[0],
                pos_y_m: wheel.pos_m_rb[1],
                steer,
                drive,
            });
        }

        Ok(Self {
            controller,
            wheels,
            min_radius_m: params.min_radius_m,
            max_radius_m: params.max_radius_m,
            ready: false,
            rc_active: false,
        })
    }

    /// Wrap a controller error with the device it occured on.
    fn controller_err(addr: &DeviceAddress) -> impl Fn(mctrl_if::controller::ControllerError) -> ChassisError {
        let addr = addr.addr();
        move |source| ChassisError::Controller { addr, source }
    }
}

impl<K: MotorController + Send> Chassis for BusChassis<K> {
    /// Identify every configured device on the bus, once.
    ///
    /// Identification doubles as a wake-up for controllers which sleep their
    /// output stages while unaddressed. Readiness latches on success.
    fn ensure_ready(&mut self) -> Result<(), ChassisError> {
        if self.ready {
            return Ok(());
        }

        for wheel in &self.wheels {
            self.controller
                .identify(&wheel.steer, DeviceClass::Servo)
                .map_err(Self::controller_err(&wheel.steer))?;
            self.controller
                .identify(&wheel.drive, DeviceClass::Brushed)
                .map_err(Self::controller_err(&wheel.drive))?;

            debug!("Wheel {} identified (steer + drive)", wheel.name);
        }

        info!("Chassis ready: {} wheel stations verified", self.wheels.len());

        self.ready = true;

        Ok(())
    }

    /// Point the wheels along their tangents about the centre of rotation
    /// and scale each wheel's drive by its distance from it.
    ///
    /// All wheels roll on circles concentric about the centre of rotation,
    /// which lies at `(0, radius)` in the body frame. The wheel tangent
    /// angle is `atan(x / (radius - y))` and the wheel speed follows
    /// `v = r * omega`, so each wheel's power is the body demand scaled by
    /// that wheel's radius over the body radius.
    fn move_velocity_radius(
        &mut self,
        throttle_pct: f64,
        radius_m: f64,
    ) -> Result<(), ChassisError> {
        if radius_m.is_finite() {
            // Demands tighter than the steering geometry allows are floored
            // at the minimum radius, keeping the demanded direction.
            let radius_m = radius_m.signum() * clamp(&radius_m.abs(), &self.min_radius_m, &f64::INFINITY);

            for wheel in &self.wheels {
                let angle_rad = (wheel.pos_x_m / (radius_m - wheel.pos_y_m)).atan();

                let wheel_radius_m =
                    ((radius_m - wheel.pos_y_m).powi(2) + wheel.pos_x_m.powi(2)).sqrt();
                let power_pct = clamp(
                    &(throttle_pct * wheel_radius_m / radius_m.abs()),
                    &-100.0,
                    &100.0,
                );

                self.controller
                    .set_angle(&wheel.steer, angle_rad.to_degrees())
                    .map_err(Self::controller_err(&wheel.steer))?;
                self.controller
                    .set_power(&wheel.drive, power_pct)
                    .map_err(Self::controller_err(&wheel.drive))?;
            }
        } else {
            // Infinite radius: all wheels straight ahead at the body demand
            for wheel in &self.wheels {
                self.controller
                    .set_angle(&wheel.steer, 0.0)
                    .map_err(Self::controller_err(&wheel.steer))?;
                self.controller
                    .set_power(&wheel.drive, throttle_pct)
                    .map_err(Self::controller_err(&wheel.drive))?;
            }
        }

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

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::chassis::WheelConfig;
    use mctrl_if::controller::ControllerError;
    use mctrl_if::device::AddressConfig;

    /// A controller stub which records every operation.
    struct StubController {
        calls: Vec<Call>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Identify(u8, DeviceClass),
        Power(u8, f64),
        Angle(u8, f64),
    }

    impl StubController {
        fn new() -> Self {
            Self { calls: Vec::new() }
        }
    }

    impl MotorController for StubController {
        fn identify(
            &mut self,
            addr: &DeviceAddress,
            class: DeviceClass,
        ) -> Result<(), ControllerError> {
            self.calls.push(Call::Identify(addr.addr(), class));
            Ok(())
        }

        fn set_power(
            &mut self,
            addr: &DeviceAddress,
            power_pct: f64,
        ) -> Result<(), ControllerError> {
            self.calls.push(Call::Power(addr.addr(), power_pct));
            Ok(())
        }

        fn set_angle(
            &mut self,
            addr: &DeviceAddress,
            angle_deg: f64,
        ) -> Result<(), ControllerError> {
            self.calls.push(Call::Angle(addr.addr(), angle_deg));
            Ok(())
        }

        fn read_voltage(&mut self, _addr: &DeviceAddress) -> Result<f64, ControllerError> {
            Ok(12.0)
        }
    }

    fn address(addr: u8) -> AddressConfig {
        AddressConfig {
            addr,
            centre_offset: 0,
            inverted: false,
        }
    }

    fn wheel(name: &str, x: f64, y: f64, steer: u8, drive: u8) -> WheelConfig {
        WheelConfig {
            name: name.into(),
            pos_m_rb: [x, y],
            steer: address(steer),
            drive: address(drive),
        }
    }

    /// A two wheel test chassis: one front-right, one front-left.
    fn params() -> Params {
        Params {
            min_radius_m: 1.0,
            max_radius_m: 10.0,
            wheels: vec![
                wheel("FR", 0.3, 0.25, 2, 3),
                wheel("FL", 0.3, -0.25, 4, 5),
            ],
        }
    }

    #[test]
    fn test_address_validation_at_construction() {
        let mut p = params();
        p.wheels[0].steer = address(1);

        match BusChassis::new(StubController::new(), p) {
            Err(ChassisInitError::InvalidAddress { role: "steer", .. }) => (),
            other => panic!("expected InvalidAddress, got {:?}", other.err()),
        }

        assert!(BusChassis::new(StubController::new(), params()).is_ok());
    }

    #[test]
    fn test_ensure_ready_is_idempotent() {
        let mut chassis = BusChassis::new(StubController::new(), params()).unwrap();

        chassis.ensure_ready().unwrap();
        assert_eq!(chassis.controller.calls.len(), 4);
        assert_eq!(
            chassis.controller.calls[0],
            Call::Identify(2, DeviceClass::Servo)
        );
        assert_eq!(
            chassis.controller.calls[1],
            Call::Identify(3, DeviceClass::Brushed)
        );

        // A second call must not touch the bus again
        chassis.ensure_ready().unwrap();
        assert_eq!(chassis.controller.calls.len(), 4);
    }

    #[test]
    fn test_straight_travel() {
        let mut chassis = BusChassis::new(StubController::new(), params()).unwrap();

        chassis.move_velocity_radius(50.0, f64::INFINITY).unwrap();

        assert_eq!(
            chassis.controller.calls,
            vec![
                Call::Angle(2, 0.0),
                Call::Power(3, 50.0),
                Call::Angle(4, 0.0),
                Call::Power(5, 50.0),
            ]
        );
    }

    #[test]
    fn test_right_turn_geometry() {
        let mut chassis = BusChassis::new(StubController::new(), params()).unwrap();

        // 2 m right turn: the centre of rotation is at (0, 2)
        chassis.move_velocity_radius(50.0, 2.0).unwrap();

        let calls = &chassis.controller.calls;

        // Inner (right) wheel steers harder than the outer (left) wheel
        let inner_angle = match calls[0] {
            Call::Angle(2, a) => a,
            ref c => panic!("unexpected call {:?}", c),
        };
        let outer_angle = match calls[2] {
            Call::Angle(4, a) => a,
            ref c => panic!("unexpected call {:?}", c),
        };
        assert!((inner_angle - (0.3f64 / 1.75).atan().to_degrees()).abs() < 1e-9);
        assert!((outer_angle - (0.3f64 / 2.25).atan().to_degrees()).abs() < 1e-9);
        assert!(inner_angle > outer_angle);

        // Inner wheel turns slower than the outer wheel
        let inner_power = match calls[1] {
            Call::Power(3, p) => p,
            ref c => panic!("unexpected call {:?}", c),
        };
        let outer_power = match calls[3] {
            Call::Power(5, p) => p,
            ref c => panic!("unexpected call {:?}", c),
        };
        assert!(inner_power < 50.0 && outer_power > 50.0);
        assert!(outer_power <= 100.0);
    }

    #[test]
    fn test_tight_demand_floored_at_min_radius() {
        let mut chassis = BusChassis::new(StubController::new(), params()).unwrap();

        // A 0.1 m demand is floored to the 1 m minimum
        chassis.move_velocity_radius(10.0, 0.1).unwrap();

        match chassis.controller.calls[0] {
            Call::Angle(2, a) => {
                assert!((a - (0.3f64 / 0.75).atan().to_degrees()).abs() < 1e-9)
            }
            ref c => panic!("unexpected call {:?}", c),
        }
    }
}
