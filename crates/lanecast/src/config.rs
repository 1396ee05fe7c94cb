//! Layered settings: defaults, then an optional JSON file, then flags and
//! `LANECAST_*` environment variables (clap resolves those two together).

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use lanecast_broadcast::{PublishPolicy, DEFAULT_PATH};
use lanecast_frame::{ModeMap, PresentationMode, CHANNEL_COUNT};
use lanecast_source::{open_file, ByteSource, FileOptions};
use serde::Deserialize;

#[cfg(unix)]
use lanecast_source::{Parity, SerialPort, SerialSettings};

use crate::cmd::{ServeArgs, SourceArgs};
use crate::exit::{io_error, source_error, CliError, CliResult, DATA_INVALID, USAGE};

/// When snapshots are pushed to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    /// After every commit, coalesced.
    Update,
    /// On a fixed cadence (`publish_interval`).
    #[default]
    Interval,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub port: Option<PathBuf>,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: String,
    pub file: Option<PathBuf>,
    pub replay: bool,
    pub byte_delay: String,
    pub listen: SocketAddr,
    pub path: String,
    pub publish: PublishMode,
    pub publish_interval: String,
    pub channels: BTreeMap<u8, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: "even".to_string(),
            file: None,
            replay: true,
            byte_delay: "1ms".to_string(),
            listen: SocketAddr::from(([127, 0, 0, 1], 8000)),
            path: DEFAULT_PATH.to_string(),
            publish: PublishMode::Interval,
            publish_interval: "100ms".to_string(),
            channels: BTreeMap::new(),
        }
    }
}

/// Where bytes come from, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    File {
        path: PathBuf,
        options: FileOptions,
    },
    #[cfg(unix)]
    Serial {
        port: PathBuf,
        settings: SerialSettings,
    },
}

impl SourceSpec {
    pub fn open(&self) -> CliResult<Box<dyn ByteSource + Send>> {
        match self {
            SourceSpec::File { path, options } => {
                open_file(path, *options).map_err(|err| source_error("open capture failed", err))
            }
            #[cfg(unix)]
            SourceSpec::Serial { port, settings } => SerialPort::open_source(port, settings)
                .map(|source| Box::new(source) as Box<dyn ByteSource + Send>)
                .map_err(|err| source_error("open serial port failed", err)),
        }
    }
}

/// Everything `serve` needs, validated.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub source: SourceSpec,
    pub listen: SocketAddr,
    pub path: String,
    pub policy: PublishPolicy,
    pub modes: ModeMap,
}

impl Settings {
    /// Defaults, overlaid with `path` when given.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read config {}", path.display()), err))?;
        serde_json::from_str(&text).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("invalid config {}: {err}", path.display()),
            )
        })
    }

    pub fn apply_source(&mut self, args: &SourceArgs) {
        if let Some(port) = &args.port {
            self.port = Some(port.clone());
            self.file = None;
        }
        if let Some(file) = &args.file {
            self.file = Some(file.clone());
        }
        if let Some(baud_rate) = args.baud_rate {
            self.baud_rate = baud_rate;
        }
        if let Some(data_bits) = args.data_bits {
            self.data_bits = data_bits;
        }
        if let Some(stop_bits) = args.stop_bits {
            self.stop_bits = stop_bits;
        }
        if let Some(parity) = &args.parity {
            self.parity = parity.clone();
        }
        if args.no_replay {
            self.replay = false;
        }
        if let Some(byte_delay) = &args.byte_delay {
            self.byte_delay = byte_delay.clone();
        }
    }

    pub fn apply_serve(&mut self, args: &ServeArgs) {
        self.apply_source(&args.source);
        if let Some(listen) = args.listen {
            self.listen = listen;
        }
        if let Some(path) = &args.path {
            self.path = path.clone();
        }
        if let Some(publish) = args.publish {
            self.publish = publish;
        }
        if let Some(interval) = &args.publish_interval {
            self.publish_interval = interval.clone();
        }
    }

    /// A capture file wins over a serial port.
    pub fn source(&self) -> CliResult<SourceSpec> {
        if let Some(path) = &self.file {
            let options = FileOptions {
                replay: self.replay,
                byte_delay: parse_delay(&self.byte_delay)?,
            };
            return Ok(SourceSpec::File {
                path: path.clone(),
                options,
            });
        }

        match &self.port {
            Some(port) => self.serial(port),
            None => Err(CliError::usage(
                "no source configured: pass --file or --port",
            )),
        }
    }

    #[cfg(unix)]
    fn serial(&self, port: &Path) -> CliResult<SourceSpec> {
        let parity: Parity = self
            .parity
            .parse()
            .map_err(|err| source_error("serial settings", err))?;
        let settings = SerialSettings {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            parity,
        };
        settings
            .validate()
            .map_err(|err| source_error("serial settings", err))?;

        Ok(SourceSpec::Serial {
            port: port.to_path_buf(),
            settings,
        })
    }

    #[cfg(not(unix))]
    fn serial(&self, port: &Path) -> CliResult<SourceSpec> {
        Err(CliError::usage(format!(
            "serial ports are not supported on this platform: {}",
            port.display()
        )))
    }

    pub fn policy(&self) -> CliResult<PublishPolicy> {
        Ok(match self.publish {
            PublishMode::Update => PublishPolicy::OnUpdate,
            PublishMode::Interval => PublishPolicy::Interval(parse_duration(&self.publish_interval)?),
        })
    }

    /// Channel modes from the config file, then each `N=MODE` override.
    pub fn modes(&self, overrides: &[String]) -> CliResult<ModeMap> {
        let mut modes = ModeMap::new();
        for (channel, mode) in &self.channels {
            let (channel, mode) = parse_mode_assignment(&format!("{channel}={mode}"))?;
            modes.insert(channel, mode);
        }
        for assignment in overrides {
            let (channel, mode) = parse_mode_assignment(assignment)?;
            modes.insert(channel, mode);
        }
        Ok(modes)
    }

    pub fn serve_config(&self, overrides: &[String]) -> CliResult<ServeConfig> {
        if !self.path.starts_with('/') {
            return Err(CliError::usage(format!(
                "websocket path must start with '/': {}",
                self.path
            )));
        }

        Ok(ServeConfig {
            source: self.source()?,
            listen: self.listen,
            path: self.path.clone(),
            policy: self.policy()?,
            modes: self.modes(overrides)?,
        })
    }
}

/// Parse `N=MODE`, e.g. `3=lane`.
pub fn parse_mode_assignment(input: &str) -> CliResult<(u8, PresentationMode)> {
    let (channel, mode) = input
        .split_once('=')
        .ok_or_else(|| CliError::usage(format!("expected CHANNEL=MODE, got: {input}")))?;

    let channel: u8 = channel
        .trim()
        .parse()
        .ok()
        .filter(|n| usize::from(*n) < CHANNEL_COUNT)
        .ok_or_else(|| {
            CliError::usage(format!(
                "channel must be 0-{}: {input}",
                CHANNEL_COUNT - 1
            ))
        })?;
    let mode: PresentationMode = mode
        .parse()
        .map_err(|err| CliError::usage(format!("{err} (channel {channel})")))?;

    Ok((channel, mode))
}

/// Parse a positive duration: `150ms`, `2s` or bare seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let duration = parse_delay(input)?;
    if duration.is_zero() {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }
    Ok(duration)
}

/// Like [`parse_duration`] but zero is allowed (no delay).
pub fn parse_delay(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
