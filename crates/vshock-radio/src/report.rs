use std::time::Duration;

use vshock_frame::PackedFrame;

/// What happened to one transmitted frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Sent; no ack was requested.
    Sent,
    /// Sent and acknowledged `after` the send.
    Acked { after: Duration },
    /// Sent, but no ack arrived within the ack timeout.
    AckTimeout { waited: Duration },
    /// The transmit pipe refused the frame.
    SendFailed { reason: String },
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::Acked { .. } => "acked",
            DeliveryOutcome::AckTimeout { .. } => "ack_timeout",
            DeliveryOutcome::SendFailed { .. } => "send_failed",
        }
    }

    /// Whether the frame reached the transport and, if asked, was acked.
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent | DeliveryOutcome::Acked { .. })
    }
}

/// Outcome of one frame taken from the outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub frame: PackedFrame,
    pub outcome: DeliveryOutcome,
}

impl DeliveryReport {
    pub fn frame_number(&self) -> u8 {
        self.frame.frame_number()
    }
}
