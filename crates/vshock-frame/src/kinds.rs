//! Frame kinds carried over the link layer.
//!
//! The set is closed by the wire protocol: ordinary data frames and the
//! sentinel acknowledgment frame a receiver returns when asked to.

use crate::codec::{PackedFrame, FRAME_SIZE, PAYLOAD_SIZE};
use crate::error::Result;

/// Acknowledgment sentinel, stored little-endian in payload bytes 0..4.
pub const ACK_SENTINEL: u32 = 0xAABB_CCDD;

/// `data_length` of a canonical acknowledgment frame.
pub const ACK_DATA_LENGTH: usize = 4;

const ACK_BYTES: [u8; ACK_DATA_LENGTH] = ACK_SENTINEL.to_le_bytes();

/// Discriminant selecting a frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Data,
    Ack,
}

impl FrameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::Data => "data",
            FrameKind::Ack => "ack",
        }
    }
}

/// A link-layer frame tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Application payload.
    Data(PackedFrame),
    /// Acknowledgment of a frame that set `require_ack`.
    Ack(PackedFrame),
}

impl Frame {
    /// A frame of `kind` in its reset state.
    pub fn new(kind: FrameKind) -> Self {
        match kind {
            FrameKind::Data => Frame::Data(PackedFrame::new()),
            FrameKind::Ack => Frame::Ack(canonical_ack()),
        }
    }

    /// A data frame carrying `payload`.
    pub fn data(payload: &[u8]) -> Result<Self> {
        Ok(Frame::Data(PackedFrame::with_data(payload)?))
    }

    /// A canonical acknowledgment frame.
    pub fn ack() -> Self {
        Frame::new(FrameKind::Ack)
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Data(_) => FrameKind::Data,
            Frame::Ack(_) => FrameKind::Ack,
        }
    }

    pub fn packed(&self) -> &PackedFrame {
        match self {
            Frame::Data(frame) | Frame::Ack(frame) => frame,
        }
    }

    pub fn packed_mut(&mut self) -> &mut PackedFrame {
        match self {
            Frame::Data(frame) | Frame::Ack(frame) => frame,
        }
    }

    pub fn into_packed(self) -> PackedFrame {
        match self {
            Frame::Data(frame) | Frame::Ack(frame) => frame,
        }
    }

    /// Encode to wire bytes.
    pub fn serialize(&self) -> [u8; FRAME_SIZE] {
        self.packed().pack()
    }

    /// Decode `buf` as a frame of `kind`.
    ///
    /// Decoding checks the format only; an `Ack` built from arbitrary bytes
    /// decodes fine and reports `false` from [`Frame::is_valid`].
    pub fn deserialize(kind: FrameKind, buf: &[u8]) -> Result<Self> {
        let packed = PackedFrame::unpack(buf)?;
        Ok(match kind {
            FrameKind::Data => Frame::Data(packed),
            FrameKind::Ack => Frame::Ack(packed),
        })
    }

    /// Decode `buf` into this frame, keeping its kind. On error the frame is
    /// left untouched.
    pub fn load(&mut self, buf: &[u8]) -> Result<()> {
        *self.packed_mut() = PackedFrame::unpack(buf)?;
        Ok(())
    }

    /// Decode `buf`, tagging it `Ack` if it has the canonical ack shape
    /// (sentinel payload, `data_length` 4) and `Data` otherwise.
    pub fn classify(buf: &[u8]) -> Result<Self> {
        let packed = PackedFrame::unpack(buf)?;
        if usize::from(packed.data_length()) == ACK_DATA_LENGTH && has_sentinel(&packed) {
            Ok(Frame::Ack(packed))
        } else {
            Ok(Frame::Data(packed))
        }
    }

    /// Restore the kind's reset state. Idempotent.
    pub fn reset(&mut self) {
        *self = Frame::new(self.kind());
    }

    /// Structural checks for every kind; acks must also carry the sentinel.
    pub fn is_valid(&self) -> bool {
        let packed = self.packed();
        let structural = usize::from(packed.data_length()) <= PAYLOAD_SIZE;
        match self {
            Frame::Data(_) => structural,
            Frame::Ack(_) => structural && has_sentinel(packed),
        }
    }

    pub fn require_ack(&self) -> bool {
        self.packed().require_ack()
    }
}

impl From<Frame> for PackedFrame {
    fn from(frame: Frame) -> Self {
        frame.into_packed()
    }
}

const CANONICAL_ACK: PackedFrame = PackedFrame::from_array(ACK_BYTES);

fn canonical_ack() -> PackedFrame {
    CANONICAL_ACK
}

fn has_sentinel(frame: &PackedFrame) -> bool {
    frame.raw_payload()[..ACK_DATA_LENGTH] == ACK_BYTES
}
