//! Display strings for decoded channels.
//!
//! Which rendering a channel gets is configured per channel; nothing on the
//! wire says whether a channel is a clock or a lane.

use std::fmt;
use std::str::FromStr;

use crate::error::UnknownMode;
use crate::protocol::{BLANK, PLACEHOLDER};
use crate::record::{ChannelRecord, Slot};

/// Shown by clock renderings while the clock is idle.
pub const CLOCK_IDLE: &str = "--:--.-";

/// How a channel is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentationMode {
    /// All 8 characters as-is.
    #[default]
    Raw,
    /// Running clock, `MM:SS.ff`.
    Clock,
    /// `<lane> <place> <clock>`.
    LaneTime,
    /// `<event>, <heat>`.
    Event,
}

impl PresentationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Clock => "clock",
            Self::LaneTime => "lane",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresentationMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "clock" => Ok(Self::Clock),
            "lane" | "lanetime" | "lane-time" => Ok(Self::LaneTime),
            "event" => Ok(Self::Event),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Render a record in the given mode. Never modifies the record.
pub fn render(record: &ChannelRecord, mode: PresentationMode) -> String {
    match mode {
        PresentationMode::Raw => render_raw(record),
        PresentationMode::Clock => render_clock(record),
        PresentationMode::LaneTime => render_lane_time(record),
        PresentationMode::Event => render_event(record),
    }
}

/// Blank, placeholder and unset segments show as `_`.
pub fn display_char(slot: Slot) -> char {
    match slot {
        None | Some(BLANK) | Some(PLACEHOLDER) => '_',
        Some(byte) => char::from(byte),
    }
}

pub fn render_raw(record: &ChannelRecord) -> String {
    record
        .data()
        .iter()
        .map(|slot| slot.map(char::from).unwrap_or(' '))
        .collect()
}

pub fn render_clock(record: &ChannelRecord) -> String {
    let c = |i: usize| display_char(record.data_at(i));

    if c(5) == '0' && c(6) == '0' {
        return CLOCK_IDLE.to_string();
    }

    let clock: String = [c(2), c(3), ':', c(4), c(5), '.', c(6), c(7)]
        .into_iter()
        .collect();
    clock.replace('_', "0")
}

pub fn render_lane_time(record: &ChannelRecord) -> String {
    format!(
        "{} {} {}",
        display_char(record.data_at(0)),
        display_char(record.data_at(1)),
        render_clock(record)
    )
}

pub fn render_event(record: &ChannelRecord) -> String {
    let chars = |range: std::ops::Range<usize>| -> String {
        range.map(|i| display_char(record.data_at(i))).collect()
    };
    format!("{}, {}", chars(0..3), chars(5..8)).replace('_', "")
}
