//! Local transports standing in for the radio medium.
//!
//! A simulated radio never touches a real antenna: every pipe is bound to a
//! local endpoint named after its derived 40-bit address. This crate provides
//! the contract the link layer needs from such a medium:
//! - [`Transport::bind`] yields a receive endpoint polled without blocking
//! - [`Transport::connect`] yields a fire-and-forget send endpoint
//!
//! Two implementations ship here: Unix datagram sockets living under an
//! [`IpcNamespace`] directory, and a process-local [`MemoryTransport`] hub.

pub mod address;
pub mod error;
pub mod memory;
pub mod naming;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use address::{Address, ParseAddressError};
pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use naming::{IpcNamespace, DEFAULT_IPC_ROOT};
pub use traits::{RxEndpoint, Transport, TxEndpoint};

#[cfg(unix)]
pub use uds::UdsTransport;
