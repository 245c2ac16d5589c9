//! Endpoint naming: where a derived address lives on the local machine.

use std::path::{Path, PathBuf};

use crate::address::Address;
use crate::error::Result;

/// Default directory holding simulated radio endpoints.
pub const DEFAULT_IPC_ROOT: &str = "/tmp/ripple_ipc";

/// Maps derived radio addresses to filesystem locations.
///
/// Every address gets `<root>/<decimal address>.ipc`. Distinct addresses
/// always produce distinct locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcNamespace {
    root: PathBuf,
}

impl IpcNamespace {
    /// Namespace rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this namespace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the endpoint for `address`.
    pub fn location(&self, address: Address) -> PathBuf {
        self.root.join(format!("{}.ipc", address.as_u64()))
    }

    /// Location URL in the `ipc://` form used by message-queue tooling.
    pub fn url(&self, address: Address) -> String {
        format!("ipc://{}", self.location(address).display())
    }

    /// Create the root directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

impl Default for IpcNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_IPC_ROOT)
    }
}
