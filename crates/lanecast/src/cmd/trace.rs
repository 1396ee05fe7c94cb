use std::fs::File;

use lanecast_frame::protocol::decode_nibble;
use lanecast_frame::{classify, ByteKind, SubMode};
use lanecast_source::{ByteSource, ReadSource, SourceError};
use serde::Serialize;

use crate::cmd::TraceArgs;
use crate::exit::{source_error, CliResult, SUCCESS};
use crate::output::{OutputFormat, Row, RowPrinter};

/// Classification of one byte.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TraceRow {
    pub offset: u64,
    pub value: u8,
    pub hex: String,
    pub kind: &'static str,
    pub sub_mode: &'static str,
    pub channel: Option<u8>,
    pub segment: Option<u8>,
    pub decoded: Option<char>,
    pub note: Option<&'static str>,
}

impl Row for TraceRow {
    const HEADER: &'static [&'static str] = &[
        "OFFSET", "HEX", "VALUE", "KIND", "MODE", "CHANNEL", "SEGMENT", "CHAR", "NOTE",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.offset.to_string(),
            self.hex.clone(),
            self.value.to_string(),
            self.kind.to_string(),
            self.sub_mode.to_string(),
            opt(self.channel),
            opt(self.segment),
            opt(self.decoded),
            self.note.unwrap_or("").to_string(),
        ]
    }

    fn pretty(&self) -> String {
        format!(
            "{:>6} {} {:>3} {:<7} {:<6} ch={:>2} seg={:>2} char={:>2} {}",
            self.offset,
            self.hex,
            self.value,
            self.kind,
            self.sub_mode,
            opt(self.channel),
            opt(self.segment),
            opt(self.decoded),
            self.note.unwrap_or("")
        )
        .trim_end()
        .to_string()
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Tracks the addressed channel without staging anything.
#[derive(Debug, Default)]
struct Tracer {
    channel: Option<u8>,
    sub_mode: SubMode,
}

impl Tracer {
    fn step(&mut self, offset: u64, byte: u8) -> TraceRow {
        let mut row = TraceRow {
            offset,
            value: byte,
            hex: format!("0x{byte:02x}"),
            kind: "data",
            sub_mode: self.sub_mode.as_str(),
            channel: self.channel,
            segment: None,
            decoded: None,
            note: None,
        };

        match classify(byte) {
            ByteKind::Control(control) => {
                let switched = self.channel.is_some_and(|c| c != control.address);
                self.channel = Some(control.address);
                self.sub_mode = control.sub_mode;

                row.kind = "control";
                row.sub_mode = control.sub_mode.as_str();
                row.channel = Some(control.address);
                row.note = match (switched, control.blank, control.address_marker) {
                    (true, true, _) => Some("switch+blank"),
                    (true, false, true) => Some("switch+address"),
                    (true, false, false) => Some("switch"),
                    (false, true, _) => Some("blank"),
                    (false, false, true) => Some("address"),
                    (false, false, false) => None,
                };
            }
            ByteKind::Data(data) => {
                row.segment = Some(data.segment);
                match (self.channel, data.segment_index()) {
                    (None, _) => row.note = Some("unaddressed"),
                    (Some(_), None) => row.note = Some("malformed"),
                    (Some(channel), Some(_)) => {
                        row.decoded = Some(char::from(decode_nibble(channel, data.nibble)));
                    }
                }
            }
        }

        row
    }
}

pub fn run(args: TraceArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.file).map_err(|source| {
        source_error(
            "open failed",
            SourceError::Open {
                path: args.file.clone(),
                source,
            },
        )
    })?;

    let mut source = ReadSource::new(file);
    let mut tracer = Tracer::default();
    let mut printer = RowPrinter::<TraceRow>::new(format);
    let mut offset = 0u64;

    while args.limit == 0 || offset < args.limit as u64 {
        let Some(byte) = source
            .read_byte()
            .map_err(|err| source_error("read failed", err))?
        else {
            break;
        };
        printer.print(&tracer.step(offset, byte));
        offset += 1;
    }
    printer.finish();

    Ok(SUCCESS)
}
