//! Per-pipe address derivation.
//!
//! Pipe 0 listens on the device address itself and carries peer traffic and
//! acknowledgments. Pipes 1-5 substitute a fixed modifier byte into the low
//! byte of the device address, the way the nRF24L01 shares the upper four
//! address bytes between its data pipes.

use std::fmt;

use vshock_transport::Address;

use crate::error::{RadioError, Result};

/// Number of pipes per device.
pub const PIPE_COUNT: usize = 6;

/// Low-byte modifier per pipe. Pipe 0 keeps the device address unmodified.
pub const ADDRESS_MODIFIERS: [u8; PIPE_COUNT] = [0x00, 0xCA, 0xC5, 0x54, 0xB3, 0xD3];

/// A validated pipe index in `0..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pipe(u8);

impl Pipe {
    /// Peer data and acknowledgments.
    pub const PEER: Pipe = Pipe(0);
    pub const DEVICE_CONTROL: Pipe = Pipe(1);
    pub const NETWORK_SERVICES: Pipe = Pipe(2);
    pub const DATA_FORWARDING: Pipe = Pipe(3);
    pub const APPLICATION_DATA_0: Pipe = Pipe(4);
    pub const APPLICATION_DATA_1: Pipe = Pipe(5);

    /// Validate a raw pipe index.
    pub fn new(index: u8) -> Result<Self> {
        if usize::from(index) < PIPE_COUNT {
            Ok(Pipe(index))
        } else {
            Err(RadioError::PipeOutOfRange(index))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// All pipes in ascending order.
    pub fn all() -> impl Iterator<Item = Pipe> {
        (0..PIPE_COUNT as u8).map(Pipe)
    }

    /// Low-byte modifier for this pipe, `None` for pipe 0.
    pub fn modifier(self) -> Option<u8> {
        match self.0 {
            0 => None,
            n => Some(ADDRESS_MODIFIERS[usize::from(n)]),
        }
    }

    /// Role name of the pipe.
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "peer",
            1 => "device-control",
            2 => "network-services",
            3 => "data-forwarding",
            4 => "application-data-0",
            _ => "application-data-1",
        }
    }

    /// Transport address of this pipe on `device`.
    ///
    /// Fails for devices rejected by [`validate_device`].
    pub fn derive(self, device: Address) -> Result<Address> {
        let device = validate_device(device)?;
        Ok(match self.modifier() {
            Some(byte) => device.with_low_byte(byte),
            None => device,
        })
    }

    pub(crate) fn slot(self) -> usize {
        usize::from(self.0)
    }
}

impl TryFrom<u8> for Pipe {
    type Error = RadioError;

    fn try_from(index: u8) -> Result<Self> {
        Pipe::new(index)
    }
}

impl From<Pipe> for u8 {
    fn from(pipe: Pipe) -> Self {
        pipe.0
    }
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that `device` can own all six pipes.
///
/// A device whose low byte equals a data-pipe modifier would share that
/// pipe's address with its own pipe 0.
pub fn validate_device(device: Address) -> Result<Address> {
    if ADDRESS_MODIFIERS[1..].contains(&device.low_byte()) {
        return Err(RadioError::AddressOutOfRange(device.as_u64()));
    }
    Ok(device)
}

/// Address a device listens on for `pipe`.
pub fn resolve_receive_address(device: Address, pipe: u8) -> Result<Address> {
    Pipe::new(pipe)?.derive(device)
}

/// Address to send to so a frame lands on `peer`'s `pipe`.
///
/// Same derivation as [`resolve_receive_address`], seen from the sender.
pub fn resolve_transmit_address(peer: Address, pipe: u8) -> Result<Address> {
    Pipe::new(pipe)?.derive(peer)
}
