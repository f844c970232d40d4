//! # Controller capability interface
//!
//! The rover's actuator wrappers all expose the same informal surface: set a
//! motor power, set a servo angle, read the input voltage, check the device
//! identity. [`MotorController`] makes that surface an explicit trait so the
//! drive layers depend only on the capability, not on a controller family.
//!
//! [`DmfeController`] implements the trait for the DMFE serial bus family
//! using the packet and response modules, generic over the byte channel so
//! it can be exercised against a stub in tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::debug;
use serde::Deserialize;
use std::io::{Read, Write};
use thiserror::Error;

// Internal
use crate::device::{DeviceAddress, DeviceClass};
use crate::packet::{self, SendError};
use crate::response::{self, ProtocolError};
use crate::ValidationError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Command byte: set brushed motor power.
pub const CMD_SET_POWER: u8 = 0x87;

/// Command byte: set servo position.
pub const CMD_SET_ANGLE: u8 = 0x82;

/// Command byte: query the controller's input voltage monitor.
pub const CMD_GET_VOLTAGE: u8 = 0x96;

/// Command byte: request the device identity string.
pub const CMD_IDENTIFY: u8 = 0xAA;

/// Servo centre position in native counts (12 bit space, 0 min, 4096 max at
/// one full revolution).
const SERVO_CENTRE_COUNTS: f64 = 2048.0;

/// Servo counts for one full revolution.
const SERVO_COUNTS_PER_REV: f64 = 4096.0;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters for a controller family.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// The native power value corresponding to a 100 % demand. The wheel
    /// drive maximum differs between vehicles, so this is configured rather
    /// than hard-coded.
    #[serde(default = "default_power_scale")]
    pub power_scale: f64,

    /// Largest servo angle accepted by `set_angle`, in degrees either side
    /// of centre.
    #[serde(default = "default_max_angle_deg")]
    pub max_angle_deg: f64,

    /// Counts per volt of the controller's input voltage monitor,
    /// empirically determined for this controller family.
    #[serde(default = "default_volts_per_count")]
    pub volts_per_count: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An error which can occur while executing a controller operation.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Invalid demand: {0}")]
    Validation(#[from] ValidationError),

    #[error("Could not send the command: {0}")]
    Send(#[from] SendError),

    #[error("Bad response from the device: {0}")]
    Protocol(#[from] ProtocolError),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Capability interface for an addressed motor/servo controller.
///
/// Every operation is a single command/response pair. Validation failures
/// are raised before the bus is touched; protocol failures are terminal for
/// the call. No operation retries internally, retry policy belongs to the
/// caller.
pub trait MotorController {
    /// Check that the device at `addr` reports the expected identity.
    fn identify(&mut self, addr: &DeviceAddress, class: DeviceClass)
        -> Result<(), ControllerError>;

    /// Drive a brushed motor at the given percentage of full power,
    /// `-100.0` to `100.0`.
    fn set_power(&mut self, addr: &DeviceAddress, power_pct: f64) -> Result<(), ControllerError>;

    /// Move a positional servo to the given angle in degrees from centre.
    fn set_angle(&mut self, addr: &DeviceAddress, angle_deg: f64) -> Result<(), ControllerError>;

    /// Read the device's input voltage in volts.
    fn read_voltage(&mut self, addr: &DeviceAddress) -> Result<f64, ControllerError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// [`MotorController`] implementation for the DMFE serial bus controller
/// family.
pub struct DmfeController<C> {
    channel: C,
    params: Params,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            power_scale: default_power_scale(),
            max_angle_deg: default_max_angle_deg(),
            volts_per_count: default_volts_per_count(),
        }
    }
}

impl<C> DmfeController<C> {
    /// Wrap an already-open byte channel to the bus.
    pub fn new(channel: C, params: Params) -> Self {
        Self { channel, params }
    }

    /// The configured maximum servo angle in degrees.
    pub fn max_angle_deg(&self) -> f64 {
        self.params.max_angle_deg
    }
}

impl<C: Read + Write> DmfeController<C> {
    /// Move a servo to a raw position in native counts, 0 to 4096 with 2048
    /// at centre.
    ///
    /// This bypasses the angle mapping and its configured bound; it exists
    /// for integration tooling which needs the full positioning range.
    pub fn set_position(
        &mut self,
        addr: &DeviceAddress,
        position: u16,
    ) -> Result<(), ControllerError> {
        if position > SERVO_COUNTS_PER_REV as u16 {
            return Err(ValidationError::PositionOutOfRange(position).into());
        }

        packet::send(
            &mut self.channel,
            addr.addr(),
            CMD_SET_ANGLE,
            packet::encode_u16(position),
        )?;
        response::read_ack(&mut self.channel)?;

        Ok(())
    }
}

impl<C: Read + Write> MotorController for DmfeController<C> {
    fn identify(
        &mut self,
        addr: &DeviceAddress,
        class: DeviceClass,
    ) -> Result<(), ControllerError> {
        packet::send(&mut self.channel, addr.addr(), CMD_IDENTIFY, [0; 3])?;
        response::read_identity(&mut self.channel, class)?;

        debug!("Device {} identified as {}", addr.addr(), class);

        Ok(())
    }

    fn set_power(&mut self, addr: &DeviceAddress, power_pct: f64) -> Result<(), ControllerError> {
        if power_pct.abs() > 100.0 {
            return Err(ValidationError::PowerOutOfRange(power_pct).into());
        }

        let power_pct = if addr.inverted() {
            -power_pct
        } else {
            power_pct
        };

        // Scale the percentage demand into the controller's native power
        // range, truncating towards zero as the controller does.
        let native = (power_pct * self.params.power_scale / 100.0) as i8;

        packet::send(
            &mut self.channel,
            addr.addr(),
            CMD_SET_POWER,
            packet::encode_i8(native),
        )?;
        response::read_ack(&mut self.channel)?;

        Ok(())
    }

    fn set_angle(&mut self, addr: &DeviceAddress, angle_deg: f64) -> Result<(), ControllerError> {
        if angle_deg.abs() > self.params.max_angle_deg {
            return Err(ValidationError::AngleOutOfRange {
                angle_deg,
                max_deg: self.params.max_angle_deg,
            }
            .into());
        }

        let angle_deg = if addr.inverted() {
            -angle_deg
        } else {
            angle_deg
        };

        // Map degrees into the 12 bit position space: 0 min, 2048 centre,
        // 4096 at a full revolution.
        let position = (SERVO_CENTRE_COUNTS + angle_deg * SERVO_COUNTS_PER_REV / 360.0) as u16;

        packet::send(
            &mut self.channel,
            addr.addr(),
            CMD_SET_ANGLE,
            packet::encode_u16(position),
        )?;
        response::read_ack(&mut self.channel)?;

        Ok(())
    }

    fn read_voltage(&mut self, addr: &DeviceAddress) -> Result<f64, ControllerError> {
        packet::send(&mut self.channel, addr.addr(), CMD_GET_VOLTAGE, [0; 3])?;

        let data = response::read_telemetry(&mut self.channel, addr.addr())?;

        Ok(data[0] as f64 / self.params.volts_per_count)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_power_scale() -> f64 {
    50.0
}

fn default_max_angle_deg() -> f64 {
    45.0
}

fn default_volts_per_count() -> f64 {
    18.8
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::AddressConfig;
    use crate::test_channel::StubChannel;
    use std::convert::TryFrom;

    fn address(addr: u8, inverted: bool) -> DeviceAddress {
        DeviceAddress::try_from(AddressConfig {
            addr,
            centre_offset: 0,
            inverted,
        })
        .unwrap()
    }

    fn acked_controller() -> DmfeController<StubChannel> {
        DmfeController::new(StubChannel::new(vec![0xFF]), Params::default())
    }

    #[test]
    fn test_set_power_validation() {
        let addr = address(2, false);

        assert!(acked_controller().set_power(&addr, 101.0).is_err());
        assert!(acked_controller().set_power(&addr, -101.0).is_err());
        assert!(acked_controller().set_power(&addr, 100.0).is_ok());
        assert!(acked_controller().set_power(&addr, -100.0).is_ok());
    }

    #[test]
    fn test_set_power_scaling() {
        // 100 % at the default scale of 50 native units
        let mut ctrl = acked_controller();
        ctrl.set_power(&address(2, false), 100.0).unwrap();
        assert_eq!(ctrl.channel.tx[5], 50);

        // Inverted addresses flip the sign on the wire
        let mut ctrl = acked_controller();
        ctrl.set_power(&address(2, true), 100.0).unwrap();
        assert_eq!(ctrl.channel.tx[5] as i8, -50);
    }

    #[test]
    fn test_set_angle_validation_and_centre() {
        let addr = address(3, false);

        // One degree over the configured maximum fails
        assert!(acked_controller().set_angle(&addr, 46.0).is_err());
        assert!(acked_controller().set_angle(&addr, -46.0).is_err());

        // Zero angle is exactly the centre position, 2048 = 0x0800
        let mut ctrl = acked_controller();
        ctrl.set_angle(&addr, 0.0).unwrap();
        assert_eq!(ctrl.channel.tx[4], CMD_SET_ANGLE);
        assert_eq!(&ctrl.channel.tx[5..7], &[0x00, 0x08]);
    }

    #[test]
    fn test_no_ack_is_error() {
        let mut ctrl = DmfeController::new(StubChannel::silent(), Params::default());
        match ctrl.set_power(&address(2, false), 10.0) {
            Err(ControllerError::Protocol(ProtocolError::Timeout)) => (),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_read_voltage() {
        // 235 counts at 18.8 counts/volt is 12.5 V
        let mut frame = vec![2u8, 1, 235, 0, 0, 0];
        let ck = frame.iter().fold(0u8, |ck, b| ck ^ b);
        frame.push(ck);

        let mut ctrl = DmfeController::new(StubChannel::new(frame), Params::default());
        let volts = ctrl.read_voltage(&address(2, false)).unwrap();
        assert!((volts - 12.5).abs() < 0.01);

        // The outgoing query is the voltage command with empty data
        assert_eq!(ctrl.channel.tx[4], CMD_GET_VOLTAGE);
    }

    #[test]
    fn test_identify() {
        let mut ctrl = DmfeController::new(
            StubChannel::new(b"DMFE Serial Servo\n".to_vec()),
            Params::default(),
        );
        assert!(ctrl.identify(&address(2, false), DeviceClass::Servo).is_ok());
        assert_eq!(ctrl.channel.tx[4], CMD_IDENTIFY);
    }
}
