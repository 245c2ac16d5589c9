//! Fixed-size link-layer framing for the virtual ShockBurst radio.
//!
//! Every frame is exactly 32 bytes, the nRF24L01 payload limit:
//! - 3 header bytes holding bit-packed control fields
//! - 29 payload bytes, of which `data_length` are meaningful
//!
//! [`codec`] owns the bit layout; [`kinds`] layers the data/ack distinction
//! on top of it.

pub mod codec;
pub mod error;
pub mod kinds;

pub use codec::{
    fields, pack, unpack, BitField, PackedFrame, FRAME_SIZE, HEADER_SIZE, PAYLOAD_SIZE,
};
pub use error::{FrameError, Result};
pub use kinds::{Frame, FrameKind, ACK_DATA_LENGTH, ACK_SENTINEL};
