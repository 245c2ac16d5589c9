use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};
use vshock_frame::FRAME_SIZE;
use vshock_transport::{Address, RxEndpoint, Transport, TxEndpoint};

use crate::address::{validate_device, Pipe, PIPE_COUNT};
use crate::error::{RadioError, Result};

/// Logical pipes of one device mapped onto transport endpoints.
///
/// Holds up to six receive endpoints, one per pipe, and a single transmit
/// endpoint aimed at some peer's pipe. Only bookkeeping lives here; the
/// endpoints come from the [`Transport`] the set was created with.
pub struct PipeSet {
    transport: Arc<dyn Transport>,
    receive: [Option<Box<dyn RxEndpoint>>; PIPE_COUNT],
    transmit: Option<TransmitPipe>,
}

struct TransmitPipe {
    peer: Address,
    pipe: Pipe,
    endpoint: Box<dyn TxEndpoint>,
}

impl PipeSet {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            receive: Default::default(),
            transmit: None,
        }
    }

    /// Name of the underlying transport.
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Bind receive `pipe` of `device`, returning the derived address.
    pub fn bind_receive(&mut self, pipe: u8, device: Address) -> Result<Address> {
        let pipe = Pipe::new(pipe)?;
        if self.is_bound(pipe) {
            return Err(RadioError::AlreadyBound(pipe));
        }
        let address = pipe.derive(device)?;
        let endpoint = self.transport.bind(address)?;
        info!(pipe = pipe.index(), role = pipe.name(), %address, "bound receive pipe");
        self.receive[pipe.slot()] = Some(endpoint);
        Ok(address)
    }

    /// Bind all six receive pipes of `device`.
    ///
    /// Either every pipe ends up bound or none of the new bindings are kept.
    pub fn bind_all(&mut self, device: Address) -> Result<()> {
        if let Some(pipe) = Pipe::all().find(|pipe| self.is_bound(*pipe)) {
            return Err(RadioError::AlreadyBound(pipe));
        }
        let device = validate_device(device)?;
        let mut endpoints = Vec::with_capacity(PIPE_COUNT);
        for pipe in Pipe::all() {
            // Dropping the partial set on error releases what was bound.
            endpoints.push(self.transport.bind(pipe.derive(device)?)?);
        }
        for (slot, endpoint) in self.receive.iter_mut().zip(endpoints) {
            *slot = Some(endpoint);
        }
        info!(%device, transport = self.transport.name(), "bound all receive pipes");
        Ok(())
    }

    /// Release receive `pipe`. Returns whether it was bound.
    pub fn unbind_receive(&mut self, pipe: Pipe) -> bool {
        let released = self.receive[pipe.slot()].take().is_some();
        if released {
            debug!(pipe = pipe.index(), "released receive pipe");
        }
        released
    }

    /// Aim the transmit pipe at `peer`'s `pipe`, replacing any previous target.
    pub fn open_transmit(&mut self, peer: Address, pipe: u8) -> Result<Address> {
        let pipe = Pipe::new(pipe)?;
        let address = pipe.derive(peer)?;
        let endpoint = self.transport.connect(address)?;
        if let Some(previous) = self.transmit.replace(TransmitPipe {
            peer,
            pipe,
            endpoint,
        }) {
            debug!(from = %previous.endpoint.address(), to = %address, "retargeted transmit pipe");
        }
        info!(%peer, pipe = pipe.index(), %address, "opened transmit pipe");
        Ok(address)
    }

    pub fn close_transmit(&mut self) {
        self.transmit = None;
    }

    pub fn is_bound(&self, pipe: Pipe) -> bool {
        self.receive[pipe.slot()].is_some()
    }

    /// Bound receive pipes in ascending order.
    pub fn bound_pipes(&self) -> impl Iterator<Item = Pipe> + '_ {
        Pipe::all().filter(|pipe| self.is_bound(*pipe))
    }

    /// Address receive `pipe` listens on, if bound.
    pub fn receive_address(&self, pipe: Pipe) -> Option<Address> {
        self.receive[pipe.slot()]
            .as_ref()
            .map(|endpoint| endpoint.address())
    }

    /// Current transmit target as `(peer, pipe)`.
    pub fn transmit_target(&self) -> Option<(Address, Pipe)> {
        self.transmit.as_ref().map(|tx| (tx.peer, tx.pipe))
    }

    /// Poll receive `pipe` once without blocking.
    pub fn poll(&mut self, pipe: Pipe) -> Result<Option<Bytes>> {
        let endpoint = self.receive[pipe.slot()]
            .as_mut()
            .ok_or(RadioError::NotBound(pipe))?;
        Ok(endpoint.try_recv()?)
    }

    /// Send one frame on the transmit pipe.
    pub fn send(&mut self, frame: &[u8; FRAME_SIZE]) -> Result<()> {
        let tx = self.transmit.as_mut().ok_or(RadioError::NoTransmitPipe)?;
        tx.endpoint.send(frame)?;
        Ok(())
    }
}

impl std::fmt::Debug for PipeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeSet")
            .field("transport", &self.transport.name())
            .field("bound", &self.bound_pipes().collect::<Vec<_>>())
            .field("transmit", &self.transmit_target())
            .finish()
    }
}
