use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use vshock_transport::{Address, Transport};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod address;
pub mod decode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bind a device's receive pipes and print incoming frames.
    Listen(ListenArgs),
    /// Send one frame to a peer pipe and report its delivery.
    Send(SendArgs),
    /// Show a device's per-pipe addresses and endpoint locations.
    Address(AddressArgs),
    /// Decode a hex-encoded 32-byte frame.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, ipc_root: &Path, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, ipc_root, format),
        Command::Send(args) => send::run(args, ipc_root, format),
        Command::Address(args) => address::run(args, ipc_root, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device address (0x-prefixed hex or decimal).
    pub device: Address,
    /// Peer whose pipe 0 receives our acks.
    #[arg(long, value_name = "ADDRESS")]
    pub reply_to: Option<Address>,
    /// Only print frames from these pipes (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub pipes: Option<Vec<u8>>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Pump period (e.g. 25ms).
    #[arg(long, default_value = "25ms")]
    pub pump_period: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Peer device address.
    pub peer: Address,
    /// Peer pipe to send to.
    #[arg(long, short = 'p', default_value = "0")]
    pub pipe: u8,
    /// Our own device address; pipe 0 is bound here to catch the ack.
    #[arg(long, value_name = "ADDRESS")]
    pub from: Option<Address>,
    /// Raw string payload.
    #[arg(long, conflicts_with = "hex")]
    pub data: Option<String>,
    /// Hex payload.
    #[arg(long, conflicts_with = "data")]
    pub hex: Option<String>,
    /// Frame number (0-31).
    #[arg(long, default_value = "0")]
    pub frame_number: u8,
    /// Endpoint (0-7).
    #[arg(long, default_value = "0")]
    pub endpoint: u8,
    /// Set the multicast flag.
    #[arg(long)]
    pub multicast: bool,
    /// Ask the receiver to acknowledge the frame.
    #[arg(long, requires = "from")]
    pub require_ack: bool,
    /// How long to wait for the ack (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub ack_timeout: String,
}

#[derive(Args, Debug)]
pub struct AddressArgs {
    /// Device address (0x-prefixed hex or decimal).
    pub device: Address,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// 64 hex digits.
    pub frame: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Unix datagram transport rooted at `ipc_root`.
pub(crate) fn uds_transport(ipc_root: &Path) -> CliResult<Arc<dyn Transport>> {
    #[cfg(unix)]
    {
        use vshock_transport::{IpcNamespace, UdsTransport};
        Ok(Arc::new(UdsTransport::new(IpcNamespace::new(ipc_root))))
    }
    #[cfg(not(unix))]
    {
        let _ = ipc_root;
        Err(CliError::new(
            USAGE,
            "unix datagram transport is not available on this platform",
        ))
    }
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
