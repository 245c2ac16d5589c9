use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use vshock_radio::{Pipe, RadioConfig, RadioEngine};

use crate::cmd::{parse_duration, uds_transport, ListenArgs};
use crate::exit::{radio_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_entry, OutputFormat};

/// How often the receive loop rechecks the Ctrl-C flag.
const RECEIVE_SLICE: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, ipc_root: &Path, format: OutputFormat) -> CliResult<i32> {
    let pump_period = parse_duration(&args.pump_period)?;
    let filter: Option<Vec<Pipe>> = args
        .pipes
        .as_ref()
        .map(|pipes| {
            pipes
                .iter()
                .map(|&pipe| Pipe::new(pipe))
                .collect::<vshock_radio::Result<Vec<Pipe>>>()
        })
        .transpose()
        .map_err(|err| radio_error("invalid --pipes", err))?;

    let config = RadioConfig {
        pump_period,
        ..RadioConfig::default()
    };
    let engine = RadioEngine::new(uds_transport(ipc_root)?, config)
        .map_err(|err| radio_error("invalid radio config", err))?;
    engine
        .bind_receive_pipes(args.device)
        .map_err(|err| radio_error("bind failed", err))?;
    if let Some(peer) = args.reply_to {
        engine
            .open_transmit_pipe(peer, 0)
            .map_err(|err| radio_error("open reply pipe failed", err))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    engine
        .start()
        .map_err(|err| radio_error("start failed", err))?;
    info!(device = %args.device, "listening");

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let Ok(entry) = engine.receive(true, Some(RECEIVE_SLICE)) else {
            continue;
        };
        if let Some(pipes) = &filter {
            if !pipes.contains(&entry.pipe) {
                continue;
            }
        }

        print_entry(&entry, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    engine.stop();
    info!(printed, stats = ?engine.stats(), "listener stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
