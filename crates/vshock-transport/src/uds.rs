use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, info};

use crate::address::Address;
use crate::error::{Result, TransportError};
use crate::naming::IpcNamespace;
use crate::traits::{RxEndpoint, Transport, TxEndpoint};

/// Largest datagram read in one poll. Anything longer is truncated, which
/// the frame decoder then rejects on length.
const MAX_DATAGRAM: usize = 64;

/// Unix datagram socket transport.
///
/// Each receive endpoint is a non-blocking `SOCK_DGRAM` socket bound at the
/// namespace location of its address; send endpoints are unbound sockets that
/// `send_to` that location. Datagram boundaries keep one frame per message.
#[derive(Debug, Clone)]
pub struct UdsTransport {
    namespace: IpcNamespace,
    mode: u32,
}

impl UdsTransport {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Transport rooted in `namespace` with the default socket mode.
    pub fn new(namespace: IpcNamespace) -> Self {
        Self {
            namespace,
            mode: Self::DEFAULT_SOCKET_MODE,
        }
    }

    /// Override the permission mode applied to bound sockets.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Namespace used to name endpoints.
    pub fn namespace(&self) -> &IpcNamespace {
        &self.namespace
    }

    fn check_path_len(path: &Path) -> Result<()> {
        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path: path.to_path_buf(),
                len,
                max: Self::MAX_PATH_LEN,
            });
        }
        Ok(())
    }
}

impl Default for UdsTransport {
    fn default() -> Self {
        Self::new(IpcNamespace::default())
    }
}

impl Transport for UdsTransport {
    fn bind(&self, address: Address) -> Result<Box<dyn RxEndpoint>> {
        let path = self.namespace.location(address);
        Self::check_path_len(&path)?;
        self.namespace.ensure_root()?;
        let receiver = UdsReceiver::bind(address, path, self.mode)?;
        Ok(Box::new(receiver))
    }

    fn connect(&self, address: Address) -> Result<Box<dyn TxEndpoint>> {
        let path = self.namespace.location(address);
        Self::check_path_len(&path)?;
        let socket = UnixDatagram::unbound().map_err(|e| TransportError::Connect {
            path: path.clone(),
            source: e,
        })?;
        debug!(%address, ?path, "opened datagram sender");
        Ok(Box::new(UdsSender {
            socket,
            address,
            path,
        }))
    }

    fn name(&self) -> &'static str {
        "unix-datagram"
    }
}

/// Bound, non-blocking receive socket.
#[derive(Debug)]
pub struct UdsReceiver {
    socket: UnixDatagram,
    address: Address,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl UdsReceiver {
    fn bind(address: Address, path: PathBuf, mode: u32) -> Result<Self> {
        let bind_err = |path: &Path, source: std::io::Error| TransportError::Bind {
            path: path.to_path_buf(),
            source,
        };

        // Remove a stale socket left by a crashed simulator, but never a
        // live peer's socket or a regular file at the same path.
        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| bind_err(&path, e))?;
            if metadata.file_type().is_socket() {
                match UnixDatagram::unbound().and_then(|check| check.connect(&path)) {
                    Ok(()) => return Err(TransportError::AddressInUse(address)),
                    Err(err) if err.kind() == ErrorKind::ConnectionRefused => {
                        debug!(?path, "removing stale socket");
                        std::fs::remove_file(&path).map_err(|e| bind_err(&path, e))?;
                    }
                    Err(err) => return Err(bind_err(&path, err)),
                }
            } else {
                return Err(bind_err(
                    &path,
                    std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                ));
            }
        }

        let socket = UnixDatagram::bind(&path).map_err(|e| bind_err(&path, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| bind_err(&path, e))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| bind_err(&path, e))?;
        let created = std::fs::symlink_metadata(&path).map_err(|e| bind_err(&path, e))?;

        info!(%address, ?path, "bound datagram endpoint");

        Ok(Self {
            socket,
            address,
            path,
            created_inode: Some((created.dev(), created.ino())),
        })
    }

    /// Filesystem path of the bound socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RxEndpoint for UdsReceiver {
    fn try_recv(&mut self) -> Result<Option<Bytes>> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.socket.recv(&mut buf) {
            Ok(n) => Ok(Some(Bytes::copy_from_slice(&buf[..n]))),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(None),
            Err(err) => Err(TransportError::Receive {
                address: self.address,
                source: err,
            }),
        }
    }

    fn address(&self) -> Address {
        self.address
    }
}

impl Drop for UdsReceiver {
    fn drop(&mut self) {
        let Some((expected_dev, expected_ino)) = self.created_inode else {
            return;
        };
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(
                    path = ?self.path,
                    "socket path identity changed; skipping cleanup"
                );
            }
        }
    }
}

/// Unbound socket that addresses every datagram to one location.
#[derive(Debug)]
pub struct UdsSender {
    socket: UnixDatagram,
    address: Address,
    path: PathBuf,
}

impl TxEndpoint for UdsSender {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        loop {
            match self.socket.send_to(datagram, &self.path) {
                Ok(_) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(TransportError::Send {
                        address: self.address,
                        source: err,
                    })
                }
            }
        }
    }

    fn address(&self) -> Address {
        self.address
    }
}
