use bytes::Bytes;

use crate::address::Address;
use crate::error::Result;

/// A medium that can host radio pipe endpoints.
///
/// Implementations must be shareable across the client thread that binds
/// pipes and the pump thread that drives them.
pub trait Transport: Send + Sync {
    /// Create a receive endpoint owning `address`.
    fn bind(&self, address: Address) -> Result<Box<dyn RxEndpoint>>;

    /// Create a send endpoint targeting `address`.
    ///
    /// Connecting never requires the far side to be bound yet; delivery
    /// problems surface on [`TxEndpoint::send`].
    fn connect(&self, address: Address) -> Result<Box<dyn TxEndpoint>>;

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Receiving half of a pipe.
pub trait RxEndpoint: Send {
    /// Poll for one datagram without blocking.
    ///
    /// `Ok(None)` means nothing is waiting. That is the normal idle outcome,
    /// not an error.
    fn try_recv(&mut self) -> Result<Option<Bytes>>;

    /// Address this endpoint is bound to.
    fn address(&self) -> Address;
}

/// Sending half of a pipe.
pub trait TxEndpoint: Send {
    /// Send one datagram. Fire-and-forget: success means it left this process.
    fn send(&mut self, datagram: &[u8]) -> Result<()>;

    /// Address this endpoint sends to.
    fn address(&self) -> Address;
}
