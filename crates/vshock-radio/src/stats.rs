use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of an engine's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Frames decoded and handed to the inbound queue.
    pub frames_received: u64,
    /// Datagrams that failed to decode.
    pub frames_dropped: u64,
    /// Acks seen on pipe 0 with no send waiting for one.
    pub late_acks: u64,
    pub frames_sent: u64,
    pub send_failures: u64,
    pub acks_sent: u64,
    pub ack_send_failures: u64,
    pub acks_received: u64,
    pub ack_timeouts: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) frames_received: AtomicU64,
    pub(crate) frames_dropped: AtomicU64,
    pub(crate) late_acks: AtomicU64,
    pub(crate) frames_sent: AtomicU64,
    pub(crate) send_failures: AtomicU64,
    pub(crate) acks_sent: AtomicU64,
    pub(crate) ack_send_failures: AtomicU64,
    pub(crate) acks_received: AtomicU64,
    pub(crate) ack_timeouts: AtomicU64,
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Counters {
    pub(crate) fn snapshot(&self) -> EngineStats {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        EngineStats {
            frames_received: read(&self.frames_received),
            frames_dropped: read(&self.frames_dropped),
            late_acks: read(&self.late_acks),
            frames_sent: read(&self.frames_sent),
            send_failures: read(&self.send_failures),
            acks_sent: read(&self.acks_sent),
            ack_send_failures: read(&self.ack_send_failures),
            acks_received: read(&self.acks_received),
            ack_timeouts: read(&self.ack_timeouts),
        }
    }
}
