use std::io::IsTerminal;
use std::marker::PhantomData;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lanecast_frame::{render, ChannelRecord, PresentationMode, Slot, SEGMENT_COUNT};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
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

/// Something a command prints once per item.
pub trait Row: Serialize {
    const HEADER: &'static [&'static str];

    fn cells(&self) -> Vec<String>;

    fn pretty(&self) -> String;
}

/// Prints rows as they arrive. Tables are collected and printed by
/// [`finish`](Self::finish) so that all rows share one grid.
pub struct RowPrinter<R> {
    format: OutputFormat,
    table_rows: Vec<Vec<String>>,
    _row: PhantomData<fn(&R)>,
}

impl<R: Row> RowPrinter<R> {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            table_rows: Vec::new(),
            _row: PhantomData,
        }
    }

    pub fn print(&mut self, row: &R) {
        match self.format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string())
            ),
            OutputFormat::Pretty => println!("{}", row.pretty()),
            OutputFormat::Table => self.table_rows.push(row.cells()),
        }
    }

    pub fn finish(self) {
        if self.format != OutputFormat::Table || self.table_rows.is_empty() {
            return;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(R::HEADER.to_vec());
        for cells in self.table_rows {
            table.add_row(cells);
        }
        println!("{table}");
    }
}

/// One committed channel, as printed by `decode`.
#[derive(Debug, Serialize)]
pub struct RecordRow {
    pub sequence: u64,
    pub channel: u8,
    pub mode: &'static str,
    pub display: String,
    pub data: [Slot; SEGMENT_COUNT],
    pub format: [Slot; SEGMENT_COUNT],
}

impl RecordRow {
    pub fn new(sequence: u64, record: &ChannelRecord, mode: PresentationMode) -> Self {
        Self {
            sequence,
            channel: record.number(),
            mode: mode.as_str(),
            display: render(record, mode),
            data: *record.data(),
            format: *record.format(),
        }
    }
}

impl Row for RecordRow {
    const HEADER: &'static [&'static str] = &["SEQ", "CHANNEL", "MODE", "DISPLAY", "DATA", "FORMAT"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.sequence.to_string(),
            self.channel.to_string(),
            self.mode.to_string(),
            self.display.clone(),
            slots_hex(&self.data),
            slots_hex(&self.format),
        ]
    }

    fn pretty(&self) -> String {
        format!(
            "seq={} channel={} mode={} display={:?} data=[{}] format=[{}]",
            self.sequence,
            self.channel,
            self.mode,
            self.display,
            slots_hex(&self.data),
            slots_hex(&self.format)
        )
    }
}

/// Hex bytes separated by spaces; unset slots print as `--`.
pub fn slots_hex(slots: &[Slot]) -> String {
    slots
        .iter()
        .map(|slot| match slot {
            Some(byte) => format!("{byte:02x}"),
            None => "--".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
