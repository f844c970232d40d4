//! # Response parsing
//!
//! After sending a command the master reads the addressed device's response
//! from the same channel. Three response shapes exist:
//!
//! - a single acknowledgement byte, `0xFF`;
//! - a fixed-length ASCII identity string (see [`DeviceClass`]);
//! - a 7 byte telemetry packet `| sender | master | data[4] | checksum |`,
//!   whose checksum is the XOR of the six preceding bytes.
//!
//! All reads are bounded by the channel's configured timeout. An empty read
//! is reported as [`ProtocolError::Timeout`]; every other framing violation
//! gets its own variant. Errors are terminal for the call that raised them,
//! retry policy belongs to the caller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::trace;
use std::io::{self, Read};
use thiserror::Error;

// Internal
use crate::device::DeviceClass;
use crate::packet::MASTER_ID;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The acknowledgement byte sent by a device on accepting a command.
pub const ACK_BYTE: u8 = 0xFF;

/// Length of a telemetry response packet on the wire.
pub const TELEMETRY_LEN: usize = 7;

/// Number of payload bytes in a telemetry response packet.
pub const TELEMETRY_DATA_LEN: usize = 4;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An error raised while reading a device's response from the bus.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("No response from the device within the channel timeout")]
    Timeout,

    #[error("Expected acknowledgement (0xFF) but received {0:#04x}")]
    NotAcknowledged(u8),

    #[error("Expected a {expected} device but found a {found} device")]
    WrongDeviceClass {
        expected: DeviceClass,
        found: DeviceClass,
    },

    #[error("Device identity {0:?} matches no known device class")]
    UnknownIdentity(String),

    #[error("Expected a response of {expected} bytes but received only {actual}")]
    ShortResponse { expected: usize, actual: usize },

    #[error("Expected a telemetry packet from device {expected} but received one from {found}")]
    WrongSender { expected: u8, found: u8 },

    #[error("Telemetry packet addressed to ID {0}, not to the master (ID 1)")]
    WrongMaster(u8),

    #[error("Calculated checksum {calculated:#04x} does not match transmitted checksum {transmitted:#04x}")]
    ChecksumMismatch { calculated: u8, transmitted: u8 },

    #[error("Failed to read from the bus: {0}")]
    Io(#[from] io::Error),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read the single byte acknowledgement of a command.
///
/// Fails with [`ProtocolError::Timeout`] if the channel returned no data
/// within its timeout, or [`ProtocolError::NotAcknowledged`] if the byte
/// received is not `0xFF`.
pub fn read_ack<C: Read>(channel: &mut C) -> Result<(), ProtocolError> {
    let mut buf = [0u8; 1];
    let n = read_bounded(channel, &mut buf)?;

    if n == 0 {
        return Err(ProtocolError::Timeout);
    }

    if buf[0] != ACK_BYTE {
        return Err(ProtocolError::NotAcknowledged(buf[0]));
    }

    Ok(())
}

/// Read and check a device identity string.
///
/// Reads the expected class's fixed identity length and compares exactly.
/// A response equal to the *other* class's identity (truncated to the read
/// length) is reported as [`ProtocolError::WrongDeviceClass`], the explicit
/// cross-check which catches a miswired bus, while any other mismatch is
/// [`ProtocolError::UnknownIdentity`].
pub fn read_identity<C: Read>(
    channel: &mut C,
    expected: DeviceClass,
) -> Result<(), ProtocolError> {
    let mut buf = vec![0u8; expected.identity_len()];
    let n = read_bounded(channel, &mut buf)?;

    if n == 0 {
        return Err(ProtocolError::Timeout);
    }

    let received = &buf[..n];

    // Cross-check against the other class first. Its literal is truncated to
    // the bounded read length: when expecting the servo class the brushed
    // identity arrives clipped, when expecting the brushed class the shorter
    // servo identity arrives whole.
    let other = expected.other();
    let other_lit = other.identity_str().as_bytes();
    let other_clipped = &other_lit[..other_lit.len().min(expected.identity_len())];

    if received == other_clipped {
        return Err(ProtocolError::WrongDeviceClass {
            expected,
            found: other,
        });
    }

    if received != expected.identity_str().as_bytes() {
        return Err(ProtocolError::UnknownIdentity(
            String::from_utf8_lossy(received).into_owned(),
        ));
    }

    Ok(())
}

/// Read a telemetry packet originating from the given device.
///
/// Returns the four payload bytes on success. Fails if fewer than 7 bytes
/// arrive, if the sender or master ID fields mismatch expectations, or if
/// the XOR checksum over the first six bytes disagrees with the seventh.
pub fn read_telemetry<C: Read>(
    channel: &mut C,
    expected_sender: u8,
) -> Result<[u8; TELEMETRY_DATA_LEN], ProtocolError> {
    let mut buf = [0u8; TELEMETRY_LEN];
    let n = read_bounded(channel, &mut buf)?;

    if n == 0 {
        return Err(ProtocolError::Timeout);
    }
    if n < TELEMETRY_LEN {
        return Err(ProtocolError::ShortResponse {
            expected: TELEMETRY_LEN,
            actual: n,
        });
    }

    trace!("bus rx: {:02x?}", buf);

    if buf[0] != expected_sender {
        return Err(ProtocolError::WrongSender {
            expected: expected_sender,
            found: buf[0],
        });
    }

    if buf[1] != MASTER_ID {
        return Err(ProtocolError::WrongMaster(buf[1]));
    }

    let calculated = buf[..6].iter().fold(0u8, |ck, b| ck ^ b);
    if calculated != buf[6] {
        return Err(ProtocolError::ChecksumMismatch {
            calculated,
            transmitted: buf[6],
        });
    }

    let mut data = [0u8; TELEMETRY_DATA_LEN];
    data.copy_from_slice(&buf[2..6]);

    Ok(data)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read up to `buf.len()` bytes, stopping at the channel's timeout.
///
/// A timed out serial read presents either as `Ok(0)` or as a `TimedOut`/
/// `WouldBlock` error depending on the platform; both end the read with
/// however many bytes arrived. Other I/O errors are surfaced.
fn read_bounded<C: Read>(channel: &mut C, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    let mut n = 0;

    while n < buf.len() {
        match channel.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(k) => n += k,
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                break
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }

    Ok(n)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_channel::StubChannel;

    #[test]
    fn test_read_ack() {
        let mut channel = StubChannel::new(vec![0xFF]);
        assert!(read_ack(&mut channel).is_ok());

        let mut channel = StubChannel::new(vec![0x00]);
        match read_ack(&mut channel) {
            Err(ProtocolError::NotAcknowledged(0x00)) => (),
            other => panic!("expected NotAcknowledged, got {:?}", other),
        }

        let mut channel = StubChannel::silent();
        match read_ack(&mut channel) {
            Err(ProtocolError::Timeout) => (),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_read_identity_ok() {
        let mut channel = StubChannel::new(b"DMFE Serial Servo\n".to_vec());
        assert!(read_identity(&mut channel, DeviceClass::Servo).is_ok());

        let mut channel = StubChannel::new(b"DMFE Serial Brushed\n".to_vec());
        assert!(read_identity(&mut channel, DeviceClass::Brushed).is_ok());
    }

    #[test]
    fn test_read_identity_cross_check() {
        // Expecting a servo but wired to a brushed controller: the 20 byte
        // brushed identity arrives clipped to the 18 byte servo read.
        let mut channel = StubChannel::new(b"DMFE Serial Brushed\n".to_vec());
        match read_identity(&mut channel, DeviceClass::Servo) {
            Err(ProtocolError::WrongDeviceClass {
                expected: DeviceClass::Servo,
                found: DeviceClass::Brushed,
            }) => (),
            other => panic!("expected WrongDeviceClass, got {:?}", other),
        }

        // Expecting a brushed controller but wired to a servo: the servo's
        // 18 byte identity arrives whole within the 20 byte bounded read.
        let mut channel = StubChannel::new(b"DMFE Serial Servo\n".to_vec());
        match read_identity(&mut channel, DeviceClass::Brushed) {
            Err(ProtocolError::WrongDeviceClass {
                expected: DeviceClass::Brushed,
                found: DeviceClass::Servo,
            }) => (),
            other => panic!("expected WrongDeviceClass, got {:?}", other),
        }
    }

    #[test]
    fn test_read_identity_unknown_and_timeout() {
        let mut channel = StubChannel::new(b"Definitely A Servo".to_vec());
        match read_identity(&mut channel, DeviceClass::Servo) {
            Err(ProtocolError::UnknownIdentity(_)) => (),
            other => panic!("expected UnknownIdentity, got {:?}", other),
        }

        let mut channel = StubChannel::silent();
        match read_identity(&mut channel, DeviceClass::Servo) {
            Err(ProtocolError::Timeout) => (),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    /// Build a valid telemetry packet from device 2 to the master.
    fn telemetry(sender: u8, master: u8, data: [u8; 4]) -> Vec<u8> {
        let mut frame = vec![sender, master, data[0], data[1], data[2], data[3]];
        let ck = frame.iter().fold(0u8, |ck, b| ck ^ b);
        frame.push(ck);
        frame
    }

    #[test]
    fn test_read_telemetry_ok() {
        let mut channel = StubChannel::new(telemetry(2, 1, [235, 0, 0, 0]));
        let data = read_telemetry(&mut channel, 2).unwrap();
        assert_eq!(data, [235, 0, 0, 0]);
    }

    #[test]
    fn test_read_telemetry_framing_errors() {
        let mut channel = StubChannel::new(vec![2, 1, 0]);
        match read_telemetry(&mut channel, 2) {
            Err(ProtocolError::ShortResponse {
                expected: 7,
                actual: 3,
            }) => (),
            other => panic!("expected ShortResponse, got {:?}", other),
        }

        let mut channel = StubChannel::new(telemetry(3, 1, [0; 4]));
        match read_telemetry(&mut channel, 2) {
            Err(ProtocolError::WrongSender {
                expected: 2,
                found: 3,
            }) => (),
            other => panic!("expected WrongSender, got {:?}", other),
        }

        let mut channel = StubChannel::new(telemetry(2, 9, [0; 4]));
        match read_telemetry(&mut channel, 2) {
            Err(ProtocolError::WrongMaster(9)) => (),
            other => panic!("expected WrongMaster, got {:?}", other),
        }

        let mut frame = telemetry(2, 1, [10, 20, 30, 40]);
        frame[6] ^= 0x55;
        let mut channel = StubChannel::new(frame);
        match read_telemetry(&mut channel, 2) {
            Err(ProtocolError::ChecksumMismatch { .. }) => (),
            other => panic!("expected ChecksumMismatch, got {:?}", other),
        }
    }
}
