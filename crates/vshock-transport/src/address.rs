use std::fmt;
use std::str::FromStr;

use crate::error::TransportError;

/// A 40-bit radio address (the nRF24L01 5-byte address width).
///
/// Used both for device base addresses and for the per-pipe addresses derived
/// from them. Values wider than 40 bits are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(u64);

impl Address {
    /// Address width in bits.
    pub const BITS: u32 = 40;
    /// Address width in bytes.
    pub const WIDTH: usize = 5;
    /// Largest representable address.
    pub const MAX: u64 = (1 << Self::BITS) - 1;

    /// Create an address, returning `None` if `raw` exceeds 40 bits.
    pub const fn new(raw: u64) -> Option<Self> {
        if raw > Self::MAX {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// The raw numeric value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The least significant address byte.
    pub const fn low_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Copy of this address with the low byte replaced.
    pub const fn with_low_byte(self, byte: u8) -> Self {
        Self((self.0 & !0xFF) | byte as u64)
    }

    /// Address bytes, least significant first (the order the radio clocks them out).
    pub fn to_le_bytes(self) -> [u8; Self::WIDTH] {
        let mut out = [0u8; Self::WIDTH];
        out.copy_from_slice(&self.0.to_le_bytes()[..Self::WIDTH]);
        out
    }
}

impl TryFrom<u64> for Address {
    type Error = TransportError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(TransportError::AddressOutOfRange(raw))
    }
}

impl From<Address> for u64 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:010X}", self.0)
    }
}

/// Errors produced when parsing an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseAddressError {
    #[error("invalid address literal: {0}")]
    Invalid(String),
    #[error("address {0:#x} exceeds 40 bits")]
    OutOfRange(u64),
}

impl FromStr for Address {
    type Err = ParseAddressError;

    /// Accepts `0x`-prefixed hex (`0xA4A5A6A7A0`) or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
            None => s.replace('_', "").parse::<u64>(),
        };
        let raw = parsed.map_err(|_| ParseAddressError::Invalid(s.to_string()))?;
        Self::new(raw).ok_or(ParseAddressError::OutOfRange(raw))
    }
}
