//! # Device addressing and identity
//!
//! Each actuator on the bus is described by a validated [`DeviceAddress`]:
//! the bus address plus the mounting data (centre offset and inversion)
//! needed to turn a chassis-frame demand into a device-frame one. Addresses
//! are validated once, at construction, rather than on every command.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::convert::TryFrom;

// Internal
use crate::ValidationError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Lowest bus address assignable to a device of this controller family.
pub const MIN_DEVICE_ADDR: u8 = 2;

/// Highest bus address assignable to a device of this controller family.
pub const MAX_DEVICE_ADDR: u8 = 253;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A validated device address.
///
/// Construct one with [`TryFrom<AddressConfig>`]; construction is the only
/// place range checks happen, after which the value is immutable and every
/// command may trust it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAddress {
    addr: u8,
    centre_offset: i16,
    inverted: bool,
}

/// The raw, unvalidated form of a device address as it appears in parameter
/// files.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AddressConfig {
    /// The bus address of the device.
    pub addr: u8,

    /// Offset of the actuator's mechanical centre from the device's nominal
    /// centre position, in native counts.
    #[serde(default)]
    pub centre_offset: i16,

    /// Whether the actuator is mounted inverted, in which case commanded
    /// values have their sign flipped.
    #[serde(default)]
    pub inverted: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The class of a bus device, reported by its identity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DeviceClass {
    /// A positional servo controller.
    Servo,

    /// A brushed DC motor controller.
    Brushed,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DeviceAddress {
    /// The bus address of the device.
    pub fn addr(&self) -> u8 {
        self.addr
    }

    /// The actuator's centre offset in native counts.
    ///
    /// TODO: apply this as a steer trim in `set_angle` once live trim
    /// adjustment is supported by the controller firmware.
    pub fn centre_offset(&self) -> i16 {
        self.centre_offset
    }

    /// Whether commanded values must have their sign flipped.
    pub fn inverted(&self) -> bool {
        self.inverted
    }
}

impl TryFrom<AddressConfig> for DeviceAddress {
    type Error = ValidationError;

    fn try_from(config: AddressConfig) -> Result<Self, Self::Error> {
        if config.addr < MIN_DEVICE_ADDR || config.addr > MAX_DEVICE_ADDR {
            return Err(ValidationError::AddressOutOfRange(config.addr));
        }

        Ok(Self {
            addr: config.addr,
            centre_offset: config.centre_offset,
            inverted: config.inverted,
        })
    }
}

impl DeviceClass {
    /// The exact identity string a device of this class reports.
    pub fn identity_str(&self) -> &'static str {
        match self {
            DeviceClass::Servo => "DMFE Serial Servo\n",
            DeviceClass::Brushed => "DMFE Serial Brushed\n",
        }
    }

    /// The number of bytes to read when expecting this class's identity.
    pub fn identity_len(&self) -> usize {
        self.identity_str().len()
    }

    /// The other device class, used for the miswiring cross-check.
    pub fn other(&self) -> Self {
        match self {
            DeviceClass::Servo => DeviceClass::Brushed,
            DeviceClass::Brushed => DeviceClass::Servo,
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DeviceClass::Servo => write!(f, "serial servo"),
            DeviceClass::Brushed => write!(f, "serial brushed"),
        }
    }
}

impl std::str::FromStr for DeviceClass {
    type Err = ParseClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "servo" => Ok(DeviceClass::Servo),
            "brushed" => Ok(DeviceClass::Brushed),
            other => Err(ParseClassError(other.into())),
        }
    }
}

/// Error parsing a [`DeviceClass`] from a string.
#[derive(Debug, thiserror::Error)]
#[error("Unknown device class {0:?}, expected \"servo\" or \"brushed\"")]
pub struct ParseClassError(String);

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn config(addr: u8) -> AddressConfig {
        AddressConfig {
            addr,
            centre_offset: 0,
            inverted: false,
        }
    }

    #[test]
    fn test_address_range() {
        assert!(DeviceAddress::try_from(config(0)).is_err());
        assert!(DeviceAddress::try_from(config(1)).is_err());
        assert!(DeviceAddress::try_from(config(254)).is_err());
        assert!(DeviceAddress::try_from(config(255)).is_err());

        assert_eq!(DeviceAddress::try_from(config(2)).unwrap().addr(), 2);
        assert_eq!(DeviceAddress::try_from(config(253)).unwrap().addr(), 253);
    }

    #[test]
    fn test_identity_lengths() {
        assert_eq!(DeviceClass::Servo.identity_len(), 18);
        assert_eq!(DeviceClass::Brushed.identity_len(), 20);
    }

    #[test]
    fn test_class_from_str() {
        assert_eq!("servo".parse::<DeviceClass>().unwrap(), DeviceClass::Servo);
        assert_eq!(
            "Brushed".parse::<DeviceClass>().unwrap(),
            DeviceClass::Brushed
        );
        assert!("stepper".parse::<DeviceClass>().is_err());
    }
}
