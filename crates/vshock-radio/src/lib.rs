//! Virtual nRF24L01 link layer.
//!
//! A [`RadioEngine`] stands in for the transceiver: clients enqueue frames
//! with [`RadioEngine::transmit`] and dequeue them with
//! [`RadioEngine::receive`], while a background pump moves frames between
//! those queues and the device's pipes, acknowledging and awaiting
//! acknowledgments the way ShockBurst hardware does.

pub mod address;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipes;
pub mod report;
pub mod stats;

mod queue;

pub use address::{
    resolve_receive_address, resolve_transmit_address, validate_device, Pipe, ADDRESS_MODIFIERS,
    PIPE_COUNT,
};
pub use config::RadioConfig;
pub use engine::{EngineState, RadioEngine, RxEntry};
pub use error::{RadioError, RecvError, Result};
pub use pipes::PipeSet;
pub use report::{DeliveryOutcome, DeliveryReport};
pub use stats::EngineStats;
pub use vshock_transport::Address;
