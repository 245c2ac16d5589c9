//! The radio engine: client queues plus the background pump.
//!
//! Each pump tick first polls every bound receive pipe once, in ascending
//! pipe order, then drains the outbound queue. A frame that asks for an ack
//! holds the pump in an ack-wait on pipe 0 until the ack arrives or the ack
//! timeout passes; nothing else is serviced meanwhile, so later frames never
//! overtake it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};
use vshock_frame::{Frame, FrameKind, PackedFrame};
use vshock_transport::{Address, Transport};

use crate::address::Pipe;
use crate::config::RadioConfig;
use crate::error::{RadioError, RecvError, Result};
use crate::pipes::PipeSet;
use crate::queue::{lock, FrameQueue};
use crate::report::{DeliveryOutcome, DeliveryReport};
use crate::stats::{bump, Counters, EngineStats};

const STOPPED: u8 = 0;
const RUNNING: u8 = 1;
const STOP_REQUESTED: u8 = 2;

/// Lifecycle state of a [`RadioEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
    /// `stop()` was called and the pump has not exited yet.
    StopRequested,
}

impl EngineState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => EngineState::Running,
            STOP_REQUESTED => EngineState::StopRequested,
            _ => EngineState::Stopped,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Stopped => "stopped",
            EngineState::Running => "running",
            EngineState::StopRequested => "stop-requested",
        }
    }
}

/// A received frame and the pipe it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxEntry {
    pub pipe: Pipe,
    pub frame: Frame,
}

/// Simulated transceiver.
///
/// Client calls only touch the queues; the pump thread started by
/// [`RadioEngine::start`] is the only code that talks to the transport.
/// Dropping the engine stops the pump.
pub struct RadioEngine {
    shared: Arc<Shared>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    config: RadioConfig,
    state: AtomicU8,
    pipes: Mutex<PipeSet>,
    inbound: FrameQueue<RxEntry>,
    outbound: FrameQueue<PackedFrame>,
    reports: FrameQueue<DeliveryReport>,
    counters: Counters,
}

impl RadioEngine {
    /// Create a stopped engine on `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: RadioConfig) -> Result<Self> {
        config.validate()?;
        debug!(transport = transport.name(), ?config, "creating radio engine");
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                state: AtomicU8::new(STOPPED),
                pipes: Mutex::new(PipeSet::new(transport)),
                inbound: FrameQueue::new(),
                outbound: FrameQueue::new(),
                reports: FrameQueue::new(),
                counters: Counters::default(),
            }),
            pump: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RadioConfig {
        &self.shared.config
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_raw(self.shared.state.load(Ordering::Acquire))
    }

    /// Launch the pump. No-op if it is already running.
    pub fn start(&self) -> Result<()> {
        let mut pump = lock(&self.pump);
        if self
            .shared
            .state
            .compare_exchange(STOPPED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("radio engine already running");
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("vshock-pump".to_string())
            .spawn(move || shared.run())
            .map_err(|e| {
                self.shared.state.store(STOPPED, Ordering::Release);
                RadioError::Spawn(e)
            })?;
        *pump = Some(handle);
        Ok(())
    }

    /// Ask the pump to stop and wait for it to exit. No-op when stopped.
    ///
    /// An ack-wait in progress runs to completion first, so this can block
    /// for up to the ack timeout plus one pump period.
    pub fn stop(&self) {
        let mut pump = lock(&self.pump);
        if self
            .shared
            .state
            .compare_exchange(RUNNING, STOP_REQUESTED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        info!("radio engine stop requested");
        if let Some(handle) = pump.take() {
            if handle.join().is_err() {
                warn!("pump thread panicked");
            }
        }
        self.shared.state.store(STOPPED, Ordering::Release);
    }

    /// Bind receive pipes 0-5 for `device`.
    pub fn bind_receive_pipes(&self, device: Address) -> Result<()> {
        lock(&self.shared.pipes).bind_all(device)
    }

    /// Bind a single receive pipe for `device`.
    pub fn bind_receive_pipe(&self, pipe: u8, device: Address) -> Result<Address> {
        lock(&self.shared.pipes).bind_receive(pipe, device)
    }

    /// Aim the transmit pipe at `peer`'s `pipe`.
    pub fn open_transmit_pipe(&self, peer: Address, pipe: u8) -> Result<Address> {
        lock(&self.shared.pipes).open_transmit(peer, pipe)
    }

    /// Validate and enqueue 32 wire bytes for sending.
    pub fn transmit(&self, bytes: &[u8]) -> Result<()> {
        let frame = PackedFrame::unpack(bytes)?;
        self.transmit_frame(frame);
        Ok(())
    }

    /// Enqueue an already-decoded frame for sending.
    pub fn transmit_frame(&self, frame: impl Into<PackedFrame>) {
        let frame = frame.into();
        trace!(
            frame_number = frame.frame_number(),
            require_ack = frame.require_ack(),
            "queued outbound frame"
        );
        self.shared.outbound.push(frame);
    }

    /// Dequeue one received frame.
    ///
    /// With `block == false` this returns [`RecvError::Empty`] at once when
    /// nothing is queued. Otherwise it waits up to `timeout` (forever when
    /// `None`) and returns [`RecvError::Timeout`] if nothing arrived.
    pub fn receive(
        &self,
        block: bool,
        timeout: Option<Duration>,
    ) -> std::result::Result<RxEntry, RecvError> {
        self.shared.inbound.pop(block, timeout)
    }

    /// Dequeue the next delivery report, with the same waiting rules as
    /// [`RadioEngine::receive`].
    pub fn next_delivery_report(
        &self,
        block: bool,
        timeout: Option<Duration>,
    ) -> std::result::Result<DeliveryReport, RecvError> {
        self.shared.reports.pop(block, timeout)
    }

    pub fn pending_inbound(&self) -> usize {
        self.shared.inbound.len()
    }

    pub fn pending_outbound(&self) -> usize {
        self.shared.outbound.len()
    }

    pub fn stats(&self) -> EngineStats {
        self.shared.counters.snapshot()
    }
}

impl Drop for RadioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for RadioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioEngine")
            .field("state", &self.state())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    fn run(&self) {
        info!(period = ?self.config.pump_period, "pump started");
        while self.is_running() {
            let tick = Instant::now();
            self.drain_receive();
            self.drain_transmit();
            if let Some(rest) = self.config.pump_period.checked_sub(tick.elapsed()) {
                thread::sleep(rest);
            }
        }
        info!("pump stopped");
    }

    /// Poll each bound pipe once, lowest index first.
    fn drain_receive(&self) {
        let mut pipes = lock(&self.pipes);
        let bound: Vec<Pipe> = pipes.bound_pipes().collect();
        for pipe in bound {
            let datagram = match pipes.poll(pipe) {
                Ok(Some(datagram)) => datagram,
                Ok(None) => continue,
                Err(err) => {
                    warn!(pipe = pipe.index(), error = %err, "receive poll failed");
                    continue;
                }
            };
            let Some(frame) = self.decode(pipe, &datagram) else {
                continue;
            };
            if pipe == Pipe::PEER && frame.kind() == FrameKind::Ack {
                bump(&self.counters.late_acks);
                debug!("discarding ack with no send awaiting it");
                continue;
            }
            self.accept(&mut pipes, pipe, frame);
        }
    }

    fn decode(&self, pipe: Pipe, datagram: &[u8]) -> Option<Frame> {
        match Frame::classify(datagram) {
            Ok(frame) => Some(frame),
            Err(err) => {
                bump(&self.counters.frames_dropped);
                warn!(
                    pipe = pipe.index(),
                    len = datagram.len(),
                    error = %err,
                    "dropping malformed frame"
                );
                None
            }
        }
    }

    /// Enqueue a received frame and ack it if asked.
    fn accept(&self, pipes: &mut PipeSet, pipe: Pipe, frame: Frame) {
        let require_ack = frame.require_ack();
        debug!(
            pipe = pipe.index(),
            kind = frame.kind().as_str(),
            frame_number = frame.packed().frame_number(),
            len = frame.packed().data_length(),
            require_ack,
            "received frame"
        );
        bump(&self.counters.frames_received);
        self.inbound.push(RxEntry { pipe, frame });
        if require_ack {
            match pipes.send(&Frame::ack().serialize()) {
                Ok(()) => {
                    bump(&self.counters.acks_sent);
                    trace!(pipe = pipe.index(), "sent ack");
                }
                Err(err) => {
                    bump(&self.counters.ack_send_failures);
                    warn!(pipe = pipe.index(), error = %err, "failed to send ack");
                }
            }
        }
    }

    fn drain_transmit(&self) {
        while self.is_running() {
            let Some(frame) = self.outbound.try_pop() else {
                break;
            };
            // Held per frame so clients can rebind pipes between sends.
            let mut pipes = lock(&self.pipes);
            let outcome = self.deliver(&mut pipes, &frame);
            drop(pipes);
            if let Some(evicted) = self
                .reports
                .push_bounded(DeliveryReport { frame, outcome }, self.config.delivery_report_backlog)
            {
                trace!(
                    frame_number = evicted.frame_number(),
                    "delivery report backlog full; discarded oldest"
                );
            }
        }
    }

    fn deliver(&self, pipes: &mut PipeSet, frame: &PackedFrame) -> DeliveryOutcome {
        if let Err(err) = pipes.send(&frame.pack()) {
            bump(&self.counters.send_failures);
            warn!(frame_number = frame.frame_number(), error = %err, "send failed");
            return DeliveryOutcome::SendFailed {
                reason: err.to_string(),
            };
        }
        bump(&self.counters.frames_sent);
        trace!(frame_number = frame.frame_number(), "sent frame");

        if !frame.require_ack() {
            return DeliveryOutcome::Sent;
        }
        self.await_ack(pipes, frame.frame_number())
    }

    /// Poll pipe 0 until an ack arrives or the ack timeout passes. Data
    /// frames that show up meanwhile are accepted as usual.
    fn await_ack(&self, pipes: &mut PipeSet, frame_number: u8) -> DeliveryOutcome {
        let listening = pipes.is_bound(Pipe::PEER);
        if !listening {
            warn!(frame_number, "pipe 0 not bound; ack cannot arrive");
        }

        let started = Instant::now();
        loop {
            thread::sleep(self.config.ack_poll_interval);
            if listening {
                match pipes.poll(Pipe::PEER) {
                    Ok(Some(datagram)) => {
                        if answers_ack_wait(&datagram) {
                            let after = started.elapsed();
                            bump(&self.counters.acks_received);
                            debug!(frame_number, ?after, "ack received");
                            return DeliveryOutcome::Acked { after };
                        }
                        if let Some(frame) = self.decode(Pipe::PEER, &datagram) {
                            self.accept(pipes, Pipe::PEER, frame);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => debug!(error = %err, "ack poll failed"),
                }
            }

            let waited = started.elapsed();
            if waited >= self.config.ack_timeout {
                bump(&self.counters.ack_timeouts);
                warn!(frame_number, ?waited, "failed to receive packet ack");
                return DeliveryOutcome::AckTimeout { waited };
            }
        }
    }
}

/// During an ack-wait any 32-byte frame carrying the sentinel is the ack,
/// whatever its header fields say.
fn answers_ack_wait(datagram: &[u8]) -> bool {
    Frame::deserialize(FrameKind::Ack, datagram).is_ok_and(|frame| frame.is_valid())
}
