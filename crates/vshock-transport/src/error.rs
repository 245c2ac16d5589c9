use std::path::PathBuf;

use crate::address::Address;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind a receive endpoint at the specified location.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to create a send endpoint for the specified location.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A datagram could not be delivered to the endpoint.
    #[error("send to {address} failed: {source}")]
    Send {
        address: Address,
        source: std::io::Error,
    },

    /// Polling a receive endpoint failed for a reason other than "no data".
    #[error("receive on {address} failed: {source}")]
    Receive {
        address: Address,
        source: std::io::Error,
    },

    /// An I/O error occurred while preparing an endpoint.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// Another receive endpoint already owns this address.
    #[error("address {0} already bound")]
    AddressInUse(Address),

    /// Nothing is bound at the destination address.
    #[error("no endpoint bound at {0}")]
    Unreachable(Address),

    /// The raw value does not fit in a 40-bit radio address.
    #[error("address {0:#x} exceeds 40 bits")]
    AddressOutOfRange(u64),
}

pub type Result<T> = std::result::Result<T, TransportError>;
