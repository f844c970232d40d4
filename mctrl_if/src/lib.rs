//! # Motor controller interface crate.
//!
//! Provides the binary bus protocol used to command the rover's serial motor
//! and servo controller boards, and the capability interface implemented for
//! each controller family.
//!
//! The bus is a point-to-point serial link shared by a number of addressed
//! devices. The master (always ID 1) sends a framed command packet to a
//! single device and then reads that device's response, which is either a
//! one byte acknowledgement, a fixed-length identity string, or a framed
//! telemetry packet. There is no bus arbitration beyond these single
//! send/response pairs.
//!
//! No connection management is performed here: all operations are generic
//! over an already-open [`std::io::Read`] + [`std::io::Write`] channel with
//! a configured read timeout, which the caller owns.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command packet framing, checksums and set-point encoding.
pub mod packet;

/// Device addressing and identity.
pub mod device;

/// Response parsing (acknowledgements, identities, telemetry packets).
pub mod response;

/// The controller capability interface and its implementations.
pub mod controller;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use controller::{DmfeController, MotorController};
pub use device::{DeviceAddress, DeviceClass};
pub use packet::Packet;
pub use response::ProtocolError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the motor controller bus, shared by every executable which
/// talks to it.
#[derive(Debug, Clone, Deserialize)]
pub struct BusParams {
    /// How to open the bus.
    pub connect: ConnectParams,

    /// Controller family scaling and limits.
    pub controller: controller::Params,
}

/// Serial connection parameters for the bus.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectParams {
    /// Serial device path.
    pub port: String,

    /// Baud rate.
    pub baud: u32,

    /// Read timeout applied to every bus response.
    ///
    /// Units: seconds
    pub timeout_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An error raised by pre-flight validation of a command, before anything is
/// written to the bus.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Device ID {0} is outside of the valid range 2-254")]
    DeviceIdOutOfRange(u8),

    #[error("Device address {0} is outside of the valid range 2-253")]
    AddressOutOfRange(u8),

    #[error("Motor power {0} % is outside of the valid range -100 to 100 %")]
    PowerOutOfRange(f64),

    #[error("Steer angle {angle_deg} deg exceeds the maximum of {max_deg} deg")]
    AngleOutOfRange { angle_deg: f64, max_deg: f64 },

    #[error("Servo position {0} is outside of the valid range 0 to 4096")]
    PositionOutOfRange(u16),
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test_channel {
    use std::io::{self, Read, Write};

    /// A byte channel stub: reads are served from a canned response buffer,
    /// and writes are captured for inspection. An exhausted response buffer
    /// reads as zero bytes, which is how a timed out serial read presents to
    /// the protocol layer.
    pub struct StubChannel {
        pub rx: io::Cursor<Vec<u8>>,
        pub tx: Vec<u8>,
    }

    impl StubChannel {
        pub fn new(response: Vec<u8>) -> Self {
            Self {
                rx: io::Cursor::new(response),
                tx: Vec::new(),
            }
        }

        /// A channel which never responds (every read times out).
        pub fn silent() -> Self {
            Self::new(Vec::new())
        }
    }

    impl Read for StubChannel {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.rx.read(buf)
        }
    }

    impl Write for StubChannel {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.tx.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
