use std::path::Path;

use vshock_radio::Pipe;
use vshock_transport::IpcNamespace;

use crate::cmd::AddressArgs;
use crate::exit::{radio_error, CliResult, SUCCESS};
use crate::output::{print_addresses, OutputFormat, PipeAddressOutput};

pub fn run(args: AddressArgs, ipc_root: &Path, format: OutputFormat) -> CliResult<i32> {
    let namespace = IpcNamespace::new(ipc_root);
    let rows = Pipe::all()
        .map(|pipe| {
            let address = pipe.derive(args.device)?;
            Ok(PipeAddressOutput::new(pipe, address, namespace.location(address)))
        })
        .collect::<vshock_radio::Result<Vec<PipeAddressOutput>>>()
        .map_err(|err| radio_error("invalid device address", err))?;
    print_addresses(args.device, &rows, format);
    Ok(SUCCESS)
}
