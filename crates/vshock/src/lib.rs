//! Virtual nRF24L01 "ShockBurst" radio over local IPC.
//!
//! Simulated devices exchange 32-byte frames through local endpoints named
//! after their pipe addresses, with the hardware's auto-acknowledgment and
//! ack-timeout behavior reproduced by a background pump.
//!
//! # Crate Structure
//!
//! - [`transport`]: endpoint naming, Unix datagram and in-memory transports
//! - [`frame`]: the 3-byte header codec and the data/ack frame kinds
//! - [`radio`]: pipe addressing, the pipe set and the [`radio::RadioEngine`]
//!
//! ```no_run
//! use std::sync::Arc;
//! use vshock::radio::{RadioConfig, RadioEngine};
//! use vshock::transport::{Address, UdsTransport};
//!
//! let device = Address::new(0xA4A5A6A7A0).unwrap();
//! let engine = RadioEngine::new(Arc::new(UdsTransport::default()), RadioConfig::default())?;
//! engine.bind_receive_pipes(device)?;
//! engine.start()?;
//! if let Ok(entry) = engine.receive(true, Some(std::time::Duration::from_secs(1))) {
//!     println!("pipe {}: {:?}", entry.pipe, entry.frame.packed().read_data());
//! }
//! # Ok::<(), vshock::radio::RadioError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use vshock_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use vshock_frame::*;
}

/// Re-export radio types.
pub mod radio {
    pub use vshock_radio::*;
}
