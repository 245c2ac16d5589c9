use std::time::Duration;

use crate::address::Pipe;

/// Errors that can occur while configuring or driving a radio.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] vshock_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] vshock_frame::FrameError),

    /// Pipe index outside 0-5.
    #[error("pipe {0} out of range (0-5)")]
    PipeOutOfRange(u8),

    /// Device address whose low byte is reserved as a data-pipe modifier.
    #[error("device address {0:#012x} ends in a pipe modifier byte")]
    AddressOutOfRange(u64),

    /// The receive pipe is already bound.
    #[error("receive pipe {0} already bound")]
    AlreadyBound(Pipe),

    /// The receive pipe has not been bound.
    #[error("receive pipe {0} not bound")]
    NotBound(Pipe),

    /// No transmit pipe has been opened.
    #[error("no transmit pipe open")]
    NoTransmitPipe,

    /// A configuration value is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    /// The pump thread could not be started.
    #[error("failed to spawn pump thread: {0}")]
    Spawn(std::io::Error),
}

impl RadioError {
    /// Pipe index, address or header field out of its legal range.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            RadioError::PipeOutOfRange(_)
                | RadioError::AddressOutOfRange(_)
                | RadioError::Frame(vshock_frame::FrameError::FieldOutOfRange { .. })
        )
    }

    /// Malformed frame bytes.
    pub fn is_format_error(&self) -> bool {
        matches!(self, RadioError::Frame(err) if err.is_format_error())
    }
}

pub type Result<T> = std::result::Result<T, RadioError>;

/// Why a dequeue returned without an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecvError {
    /// Non-blocking call and nothing was queued.
    #[error("queue empty")]
    Empty,

    /// Blocking call and nothing arrived in time.
    #[error("nothing received within {0:?}")]
    Timeout(Duration),
}
