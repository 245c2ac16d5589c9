use std::path::Path;
use std::time::Duration;

use tracing::debug;
use vshock_frame::PackedFrame;
use vshock_radio::{DeliveryOutcome, RadioConfig, RadioEngine};

use crate::cmd::decode::parse_hex;
use crate::cmd::{parse_duration, uds_transport, SendArgs};
use crate::exit::{
    frame_error, radio_error, CliError, CliResult, SUCCESS, TIMEOUT, TRANSPORT_ERROR,
};
use crate::output::{print_report, OutputFormat};

/// Extra time allowed for the pump to pick the frame up and report on it.
const REPORT_GRACE: Duration = Duration::from_secs(2);

pub fn run(args: SendArgs, ipc_root: &Path, format: OutputFormat) -> CliResult<i32> {
    let ack_timeout = parse_duration(&args.ack_timeout)?;
    let frame = build_frame(&args)?;

    let config = RadioConfig {
        ack_timeout,
        ..RadioConfig::default()
    };
    let engine = RadioEngine::new(uds_transport(ipc_root)?, config)
        .map_err(|err| radio_error("invalid radio config", err))?;

    if let Some(own) = args.from {
        engine
            .bind_receive_pipe(0, own)
            .map_err(|err| radio_error("bind failed", err))?;
    }
    let target = engine
        .open_transmit_pipe(args.peer, args.pipe)
        .map_err(|err| radio_error("open transmit pipe failed", err))?;
    debug!(peer = %args.peer, pipe = args.pipe, %target, "sending frame");

    engine.transmit_frame(frame);
    engine
        .start()
        .map_err(|err| radio_error("start failed", err))?;
    let report = engine
        .next_delivery_report(true, Some(ack_timeout + REPORT_GRACE))
        .map_err(|err| CliError::new(TIMEOUT, format!("no delivery report: {err}")))?;
    engine.stop();

    print_report(&report, engine.stats(), format);
    Ok(exit_code(&report.outcome))
}

fn build_frame(args: &SendArgs) -> CliResult<PackedFrame> {
    let payload = match (&args.data, &args.hex) {
        (Some(data), _) => data.as_bytes().to_vec(),
        (None, Some(hex)) => parse_hex(hex)?,
        (None, None) => Vec::new(),
    };
    let build = || -> vshock_frame::Result<PackedFrame> {
        let mut frame = PackedFrame::with_data(&payload)?;
        frame.set_frame_number(args.frame_number)?;
        frame.set_endpoint(args.endpoint)?;
        frame.set_multicast(args.multicast);
        frame.set_require_ack(args.require_ack);
        Ok(frame)
    };
    build().map_err(|err| frame_error("invalid frame", err))
}

fn exit_code(outcome: &DeliveryOutcome) -> i32 {
    match outcome {
        DeliveryOutcome::Sent | DeliveryOutcome::Acked { .. } => SUCCESS,
        DeliveryOutcome::AckTimeout { .. } => TIMEOUT,
        DeliveryOutcome::SendFailed { .. } => TRANSPORT_ERROR,
    }
}
