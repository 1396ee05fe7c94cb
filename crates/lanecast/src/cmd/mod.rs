use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::config::PublishMode;
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod serve;
pub mod trace;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a live source and serve frames to WebSocket clients.
    Serve(ServeArgs),
    /// Decode a capture file once and print every committed channel.
    Decode(DecodeArgs),
    /// Dump how each byte of a capture is classified.
    Trace(TraceArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: Option<&Path>) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, config),
        Command::Decode(args) => decode::run(args, format, config),
        Command::Trace(args) => trace::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where `serve` reads bytes from.
#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Serial device the console is attached to.
    #[arg(long, env = "LANECAST_PORT", value_name = "DEVICE")]
    pub port: Option<PathBuf>,
    /// Read a capture file instead of a serial port.
    #[arg(long, env = "LANECAST_FILE", value_name = "PATH", conflicts_with = "port")]
    pub file: Option<PathBuf>,
    /// Serial line speed.
    #[arg(long, env = "LANECAST_BAUD_RATE")]
    pub baud_rate: Option<u32>,
    /// Serial data bits (5-8).
    #[arg(long, env = "LANECAST_DATA_BITS")]
    pub data_bits: Option<u8>,
    /// Serial stop bits (1 or 2).
    #[arg(long, env = "LANECAST_STOP_BITS")]
    pub stop_bits: Option<u8>,
    /// Serial parity: none, odd or even.
    #[arg(long, env = "LANECAST_PARITY")]
    pub parity: Option<String>,
    /// Stop at the end of the capture file instead of starting over.
    #[arg(long, env = "LANECAST_NO_REPLAY")]
    pub no_replay: bool,
    /// Pause before each capture byte (e.g. 1ms, 0 to disable).
    #[arg(long, env = "LANECAST_BYTE_DELAY", value_name = "DURATION")]
    pub byte_delay: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Address the WebSocket server binds.
    #[arg(long, env = "LANECAST_LISTEN", value_name = "ADDR")]
    pub listen: Option<SocketAddr>,
    /// Request path clients upgrade on.
    #[arg(long, env = "LANECAST_PATH")]
    pub path: Option<String>,
    /// Publish after every update or on a fixed interval.
    #[arg(long, env = "LANECAST_PUBLISH", value_enum)]
    pub publish: Option<PublishMode>,
    /// Interval between publishes (e.g. 100ms, 1s).
    #[arg(long, env = "LANECAST_PUBLISH_INTERVAL", value_name = "DURATION")]
    pub publish_interval: Option<String>,
    /// Presentation mode for a channel (repeatable), e.g. 3=lane.
    #[arg(long = "mode", value_name = "N=MODE")]
    pub modes: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to decode.
    pub file: PathBuf,
    /// Only print these channels (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub channels: Option<Vec<u8>>,
    /// Exit after printing N records.
    #[arg(long)]
    pub count: Option<usize>,
    /// Presentation mode for a channel (repeatable), e.g. 3=lane.
    #[arg(long = "mode", value_name = "N=MODE")]
    pub modes: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TraceArgs {
    /// Capture file to inspect.
    pub file: PathBuf,
    /// Stop after N bytes (0 for the whole file).
    #[arg(long, default_value_t = 256)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
