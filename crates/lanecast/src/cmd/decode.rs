use std::path::Path;
use std::time::Duration;

use lanecast_frame::{Advance, Frame, SegmentDecoder};
use lanecast_source::{open_file, FileOptions};
use tracing::debug;

use crate::cmd::DecodeArgs;
use crate::config::Settings;
use crate::exit::{decode_error, source_error, CliResult, SUCCESS};
use crate::output::{OutputFormat, RecordRow, RowPrinter};

pub fn run(args: DecodeArgs, format: OutputFormat, config: Option<&Path>) -> CliResult<i32> {
    let settings = Settings::load(config)?;
    let modes = settings.modes(&args.modes)?;

    let options = FileOptions {
        replay: false,
        byte_delay: Duration::ZERO,
    };
    let source = open_file(&args.file, options).map_err(|err| source_error("open failed", err))?;

    let mut decoder = SegmentDecoder::new(source);
    let mut frame = Frame::new(modes);
    let mut printer = RowPrinter::<RecordRow>::new(format);
    let mut printed = 0usize;

    while args.count.map_or(true, |count| printed < count) {
        match decoder
            .advance()
            .map_err(|err| decode_error("decode failed", err))?
        {
            Advance::More(_) => {}
            Advance::EndOfStream => break,
        }

        let Some(record) = decoder.committed() else {
            continue;
        };
        let sequence = frame.commit(record);

        if let Some(channels) = &args.channels {
            if !channels.contains(&record.number()) {
                continue;
            }
        }

        printer.print(&RecordRow::new(sequence, record, frame.mode_for(record.number())));
        printed += 1;
    }
    printer.finish();

    let stats = decoder.stats();
    debug!(
        bytes = stats.bytes,
        control_bytes = stats.control_bytes,
        data_bytes = stats.data_bytes,
        malformed = stats.malformed,
        ignored = stats.ignored,
        commits = stats.commits,
        "decode finished"
    );
    Ok(SUCCESS)
}
