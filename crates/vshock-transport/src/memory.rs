use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::{debug, trace};

use crate::address::Address;
use crate::error::{Result, TransportError};
use crate::traits::{RxEndpoint, Transport, TxEndpoint};

type Mailboxes = HashMap<Address, VecDeque<Bytes>>;

/// Process-local transport: a shared hub of per-address mailboxes.
///
/// Clones share the same hub, so several simulated radios in one process can
/// talk through it. Sends to an address nobody has bound fail with
/// [`TransportError::Unreachable`]; the datagram is not buffered.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    hub: Arc<Mutex<Mailboxes>>,
}

impl MemoryTransport {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a receive endpoint currently owns `address`.
    pub fn is_bound(&self, address: Address) -> bool {
        lock(&self.hub).contains_key(&address)
    }

    /// Number of datagrams waiting in the mailbox for `address`.
    pub fn pending(&self, address: Address) -> usize {
        lock(&self.hub).get(&address).map_or(0, VecDeque::len)
    }
}

fn lock(hub: &Mutex<Mailboxes>) -> MutexGuard<'_, Mailboxes> {
    hub.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Transport for MemoryTransport {
    fn bind(&self, address: Address) -> Result<Box<dyn RxEndpoint>> {
        let mut hub = lock(&self.hub);
        if hub.contains_key(&address) {
            return Err(TransportError::AddressInUse(address));
        }
        hub.insert(address, VecDeque::new());
        debug!(%address, "bound memory mailbox");
        Ok(Box::new(MemoryReceiver {
            hub: Arc::clone(&self.hub),
            address,
        }))
    }

    fn connect(&self, address: Address) -> Result<Box<dyn TxEndpoint>> {
        Ok(Box::new(MemorySender {
            hub: Arc::clone(&self.hub),
            address,
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryReceiver {
    hub: Arc<Mutex<Mailboxes>>,
    address: Address,
}

impl RxEndpoint for MemoryReceiver {
    fn try_recv(&mut self) -> Result<Option<Bytes>> {
        Ok(lock(&self.hub)
            .get_mut(&self.address)
            .and_then(VecDeque::pop_front))
    }

    fn address(&self) -> Address {
        self.address
    }
}

impl Drop for MemoryReceiver {
    fn drop(&mut self) {
        lock(&self.hub).remove(&self.address);
    }
}

struct MemorySender {
    hub: Arc<Mutex<Mailboxes>>,
    address: Address,
}

impl TxEndpoint for MemorySender {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        let mut hub = lock(&self.hub);
        let mailbox = hub
            .get_mut(&self.address)
            .ok_or(TransportError::Unreachable(self.address))?;
        mailbox.push_back(Bytes::copy_from_slice(datagram));
        trace!(address = %self.address, len = datagram.len(), "queued datagram");
        Ok(())
    }

    fn address(&self) -> Address {
        self.address
    }
}
