//! # Command packet framing
//!
//! Every command sent to a bus device is a 9 byte packet:
//!
//! ```text
//! | 0xDD 0xDD | sender | receiver | command | data[3] | checksum |
//! ```
//!
//! The sender is always the master (ID 1). The checksum is the XOR of the
//! receiver ID, the command byte and the three data bytes. Packets are built
//! fresh for every send and written to the channel in a single write; a
//! short write or I/O failure is surfaced to the caller with no retry.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use byteorder::{ByteOrder, LittleEndian};
use log::trace;
use thiserror::Error;

// Internal
use crate::ValidationError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The two byte preamble which starts every command packet.
pub const PREAMBLE: [u8; 2] = [0xDD, 0xDD];

/// The bus ID of the master (this software).
pub const MASTER_ID: u8 = 1;

/// Number of data bytes carried by a command packet.
pub const DATA_LEN: usize = 3;

/// Total length of a command packet on the wire.
pub const PACKET_LEN: usize = 9;

/// Lowest valid receiver ID. IDs 0 and 1 are reserved (1 is the master).
pub const MIN_RECEIVER_ID: u8 = 2;

/// Highest valid receiver ID. 0xFF is reserved for the acknowledgement byte.
pub const MAX_RECEIVER_ID: u8 = 0xFE;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single command packet, constructed fresh per send and never mutated
/// after the checksum has been computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// The bus ID of the device the packet is addressed to.
    pub receiver_id: u8,

    /// The command byte.
    pub command: u8,

    /// The data bytes, zero padded if the command carries fewer than three.
    pub data: [u8; DATA_LEN],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An error which can occur while sending a command packet.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to write the packet to the bus: {0}")]
    Io(#[from] std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Packet {
    /// Build a new packet for the given receiver.
    ///
    /// Fails with [`ValidationError::DeviceIdOutOfRange`] if the receiver ID
    /// is not within `2..=254`, without touching the bus.
    pub fn new(receiver_id: u8, command: u8, data: [u8; DATA_LEN]) -> Result<Self, ValidationError> {
        if receiver_id < MIN_RECEIVER_ID || receiver_id > MAX_RECEIVER_ID {
            return Err(ValidationError::DeviceIdOutOfRange(receiver_id));
        }

        Ok(Self {
            receiver_id,
            command,
            data,
        })
    }

    /// The checksum byte for this packet.
    pub fn checksum(&self) -> u8 {
        self.data
            .iter()
            .fold(self.receiver_id ^ self.command, |ck, b| ck ^ b)
    }

    /// Serialise the packet into its wire representation.
    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        [
            PREAMBLE[0],
            PREAMBLE[1],
            MASTER_ID,
            self.receiver_id,
            self.command,
            self.data[0],
            self.data[1],
            self.data[2],
            self.checksum(),
        ]
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Frame a command and write it to the bus in a single write.
///
/// Validation failures are raised before anything is written. I/O failures
/// are surfaced to the caller; no retry is performed here.
pub fn send<C: std::io::Write>(
    channel: &mut C,
    receiver_id: u8,
    command: u8,
    data: [u8; DATA_LEN],
) -> Result<(), SendError> {
    let packet = Packet::new(receiver_id, command, data)?;
    let bytes = packet.to_bytes();

    trace!(
        "bus tx: {:02x?} (receiver {}, command {:#04x})",
        bytes,
        receiver_id,
        command
    );

    channel.write_all(&bytes)?;

    Ok(())
}

/// Pack a signed 8 bit set-point into the three byte data field.
///
/// The value occupies the low byte, the remaining bytes are zero.
pub fn encode_i8(value: i8) -> [u8; DATA_LEN] {
    [value as u8, 0, 0]
}

/// Pack an unsigned 16 bit set-point into the three byte data field.
///
/// The value is little-endian in the low two bytes, the third byte is zero.
pub fn encode_u16(value: u16) -> [u8; DATA_LEN] {
    let mut data = [0u8; DATA_LEN];
    LittleEndian::write_u16(&mut data[0..2], value);
    data
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
