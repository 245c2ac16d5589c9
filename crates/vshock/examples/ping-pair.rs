//! Two simulated radios in one process exchanging acknowledged frames.
//!
//! Run with:
//!   cargo run --example ping-pair
//!
//! Device B sends five frames to device A's DEVICE_CONTROL pipe, each asking
//! for an ack; A's pump acknowledges them back on B's pipe 0.

use std::sync::Arc;
use std::time::Duration;

use vshock::frame::PackedFrame;
use vshock::radio::{RadioConfig, RadioEngine};
use vshock::transport::{Address, MemoryTransport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let device_a = Address::try_from(0xA4A5A6A7A0_u64)?;
    let device_b = Address::try_from(0xB4B5B6B7B5_u64)?;

    let medium = MemoryTransport::new();
    let a = RadioEngine::new(Arc::new(medium.clone()), RadioConfig::default())?;
    let b = RadioEngine::new(Arc::new(medium), RadioConfig::default())?;

    a.bind_receive_pipes(device_a)?;
    b.bind_receive_pipes(device_b)?;
    a.open_transmit_pipe(device_b, 0)?;
    b.open_transmit_pipe(device_a, 1)?;
    a.start()?;
    b.start()?;

    for n in 0..5u8 {
        let mut frame = PackedFrame::with_data(format!("ping {n}").as_bytes())?;
        frame.set_frame_number(n)?;
        frame.set_require_ack(true);
        b.transmit_frame(frame);
    }

    for _ in 0..5 {
        let entry = a.receive(true, Some(Duration::from_secs(1)))?;
        eprintln!(
            "A got {:?} on pipe {} ({})",
            String::from_utf8_lossy(entry.frame.packed().read_data()),
            entry.pipe,
            entry.pipe.name()
        );
        let report = b.next_delivery_report(true, Some(Duration::from_secs(6)))?;
        eprintln!(
            "B frame {} -> {}",
            report.frame_number(),
            report.outcome.as_str()
        );
    }

    a.stop();
    b.stop();
    eprintln!("A: {:?}", a.stats());
    eprintln!("B: {:?}", b.stats());
    Ok(())
}
