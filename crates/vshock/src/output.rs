use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use vshock_frame::{Frame, PackedFrame};
use vshock_radio::{DeliveryOutcome, DeliveryReport, EngineStats, Pipe, RxEntry};
use vshock_transport::Address;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    kind: &'static str,
    version: u8,
    data_length: u8,
    frame_number: u8,
    endpoint: u8,
    multicast: bool,
    require_ack: bool,
    valid: bool,
    data: String,
    raw: String,
}

impl FrameOutput {
    fn new(frame: &Frame) -> Self {
        let packed = frame.packed();
        Self {
            kind: frame.kind().as_str(),
            version: packed.version(),
            data_length: packed.data_length(),
            frame_number: packed.frame_number(),
            endpoint: packed.endpoint(),
            multicast: packed.multicast(),
            require_ack: packed.require_ack(),
            valid: frame.is_valid(),
            data: hex::encode(packed.read_data()),
            raw: hex::encode(frame.serialize()),
        }
    }
}

#[derive(Serialize)]
struct EntryOutput {
    pipe: u8,
    pipe_name: &'static str,
    frame: FrameOutput,
    timestamp: String,
}

pub fn print_entry(entry: &RxEntry, format: OutputFormat) {
    let frame = FrameOutput::new(&entry.frame);
    match format {
        OutputFormat::Json => print_json(&EntryOutput {
            pipe: entry.pipe.index(),
            pipe_name: entry.pipe.name(),
            frame,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = table(vec!["PIPE", "KIND", "FRAME", "EP", "ACK", "LEN", "DATA"]);
            table.add_row(vec![
                format!("{} ({})", entry.pipe, entry.pipe.name()),
                frame.kind.to_string(),
                frame.frame_number.to_string(),
                frame.endpoint.to_string(),
                frame.require_ack.to_string(),
                frame.data_length.to_string(),
                data_preview(entry.frame.packed()),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "pipe={} ({}) kind={} frame={} endpoint={} ack={} len={} data={}",
                entry.pipe,
                entry.pipe.name(),
                frame.kind,
                frame.frame_number,
                frame.endpoint,
                frame.require_ack,
                frame.data_length,
                data_preview(entry.frame.packed())
            );
        }
    }
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let out = FrameOutput::new(frame);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = table(vec!["FIELD", "VALUE"]);
            for (field, value) in [
                ("kind", out.kind.to_string()),
                ("version", out.version.to_string()),
                ("data_length", out.data_length.to_string()),
                ("frame_number", out.frame_number.to_string()),
                ("endpoint", out.endpoint.to_string()),
                ("multicast", out.multicast.to_string()),
                ("require_ack", out.require_ack.to_string()),
                ("valid", out.valid.to_string()),
                ("data", out.data.clone()),
            ] {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} version={} len={} frame={} endpoint={} multicast={} ack={} valid={} data={}",
                out.kind,
                out.version,
                out.data_length,
                out.frame_number,
                out.endpoint,
                out.multicast,
                out.require_ack,
                out.valid,
                out.data
            );
        }
    }
}

#[derive(Serialize)]
struct ReportOutput {
    outcome: &'static str,
    frame_number: u8,
    endpoint: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    stats: StatsOutput,
}

#[derive(Serialize)]
struct StatsOutput {
    frames_sent: u64,
    send_failures: u64,
    acks_received: u64,
    ack_timeouts: u64,
    frames_received: u64,
    frames_dropped: u64,
}

impl From<EngineStats> for StatsOutput {
    fn from(stats: EngineStats) -> Self {
        Self {
            frames_sent: stats.frames_sent,
            send_failures: stats.send_failures,
            acks_received: stats.acks_received,
            ack_timeouts: stats.ack_timeouts,
            frames_received: stats.frames_received,
            frames_dropped: stats.frames_dropped,
        }
    }
}

pub fn print_report(report: &DeliveryReport, stats: EngineStats, format: OutputFormat) {
    let (elapsed, reason) = match &report.outcome {
        DeliveryOutcome::Sent => (None, None),
        DeliveryOutcome::Acked { after } => (Some(*after), None),
        DeliveryOutcome::AckTimeout { waited } => (Some(*waited), None),
        DeliveryOutcome::SendFailed { reason } => (None, Some(reason.clone())),
    };
    let out = ReportOutput {
        outcome: report.outcome.as_str(),
        frame_number: report.frame.frame_number(),
        endpoint: report.frame.endpoint(),
        elapsed_ms: elapsed.map(|d| d.as_millis()),
        reason,
        stats: stats.into(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = table(vec!["OUTCOME", "FRAME", "EP", "ELAPSED", "DETAIL"]);
            table.add_row(vec![
                out.outcome.to_string(),
                out.frame_number.to_string(),
                out.endpoint.to_string(),
                elapsed.map(format_duration).unwrap_or_default(),
                out.reason.clone().unwrap_or_default(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = format!("outcome={} frame={}", out.outcome, out.frame_number);
            if let Some(elapsed) = elapsed {
                line.push_str(&format!(" elapsed={}", format_duration(elapsed)));
            }
            if let Some(reason) = &out.reason {
                line.push_str(&format!(" reason={reason}"));
            }
            println!("{line}");
        }
    }
}

#[derive(Serialize)]
pub struct PipeAddressOutput {
    pub pipe: u8,
    pub role: &'static str,
    pub modifier: Option<String>,
    pub address: String,
    pub address_decimal: u64,
    pub location: PathBuf,
}

impl PipeAddressOutput {
    pub fn new(pipe: Pipe, address: Address, location: PathBuf) -> Self {
        Self {
            pipe: pipe.index(),
            role: pipe.name(),
            modifier: pipe.modifier().map(|byte| format!("0x{byte:02X}")),
            address: address.to_string(),
            address_decimal: address.as_u64(),
            location,
        }
    }
}

pub fn print_addresses(device: Address, rows: &[PipeAddressOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct AddressesOutput<'a> {
                device: String,
                pipes: &'a [PipeAddressOutput],
            }
            print_json(&AddressesOutput {
                device: device.to_string(),
                pipes: rows,
            });
        }
        OutputFormat::Table => {
            let mut table = table(vec!["PIPE", "ROLE", "MODIFIER", "ADDRESS", "LOCATION"]);
            for row in rows {
                table.add_row(vec![
                    row.pipe.to_string(),
                    row.role.to_string(),
                    row.modifier.clone().unwrap_or_else(|| "-".to_string()),
                    row.address.clone(),
                    row.location.display().to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "pipe={} role={} address={} location={}",
                    row.pipe,
                    row.role,
                    row.address,
                    row.location.display()
                );
            }
        }
    }
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn data_preview(frame: &PackedFrame) -> String {
    let data = frame.read_data();
    match std::str::from_utf8(data) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => hex::encode(data),
    }
}

fn format_duration(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
