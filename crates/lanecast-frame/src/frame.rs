use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::record::ChannelRecord;
use crate::render::{render, PresentationMode};

/// Presentation mode per channel number.
pub type ModeMap = BTreeMap<u8, PresentationMode>;

/// The latest committed record of every channel seen so far.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    channels: BTreeMap<u8, ChannelRecord>,
    formats: Arc<ModeMap>,
    sequence: u64,
}

impl Frame {
    pub fn new(formats: ModeMap) -> Self {
        Self {
            channels: BTreeMap::new(),
            formats: Arc::new(formats),
            sequence: 0,
        }
    }

    /// Merge a committed record. Known channels are updated in place.
    pub fn commit(&mut self, record: &ChannelRecord) -> u64 {
        match self.channels.entry(record.number()) {
            Entry::Occupied(mut entry) => entry.get_mut().copy_slots_from(record),
            Entry::Vacant(entry) => {
                trace!(
                    channel = record.number(),
                    mode = %self.formats.get(&record.number()).copied().unwrap_or_default(),
                    "first commit for channel"
                );
                entry.insert(record.clone());
            }
        }
        self.sequence += 1;
        self.sequence
    }

    pub fn channel(&self, number: u8) -> Option<&ChannelRecord> {
        self.channels.get(&number)
    }

    /// Configured mode for a channel, `Raw` when unconfigured.
    pub fn mode_for(&self, number: u8) -> PresentationMode {
        self.formats.get(&number).copied().unwrap_or_default()
    }

    /// Number of commits merged so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// An owned copy of the current state.
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            sequence: self.sequence,
            channels: self.channels.clone(),
            formats: Arc::clone(&self.formats),
        }
    }
}

/// A point-in-time copy of a [`Frame`], detached from further commits.
#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    sequence: u64,
    channels: BTreeMap<u8, ChannelRecord>,
    formats: Arc<ModeMap>,
}

impl FrameSnapshot {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn channels(&self) -> &BTreeMap<u8, ChannelRecord> {
        &self.channels
    }

    pub fn channel(&self, number: u8) -> Option<&ChannelRecord> {
        self.channels.get(&number)
    }

    pub fn mode_for(&self, number: u8) -> PresentationMode {
        self.formats.get(&number).copied().unwrap_or_default()
    }

    /// Render one channel in its configured mode.
    pub fn render(&self, number: u8) -> Option<String> {
        self.channel(number)
            .map(|record| render(record, self.mode_for(number)))
    }

    /// Channels in ascending order with their configured mode.
    pub fn iter(&self) -> impl Iterator<Item = (&ChannelRecord, PresentationMode)> + '_ {
        self.channels
            .values()
            .map(|record| (record, self.mode_for(record.number())))
    }
}

/// A [`Frame`] shared between the decode loop and readers.
///
/// Commits and snapshots take the same lock, so a snapshot never contains a
/// record that is half old and half new.
#[derive(Debug, Default)]
pub struct FrameStore {
    inner: Mutex<Frame>,
}

impl FrameStore {
    pub fn new(formats: ModeMap) -> Self {
        Self {
            inner: Mutex::new(Frame::new(formats)),
        }
    }

    /// Merge a committed record; returns the new sequence number.
    pub fn commit(&self, record: &ChannelRecord) -> u64 {
        self.lock().commit(record)
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        self.lock().snapshot()
    }

    pub fn sequence(&self) -> u64 {
        self.lock().sequence()
    }

    fn lock(&self) -> MutexGuard<'_, Frame> {
        // A panic while holding the lock cannot leave a record half-copied:
        // slot arrays are replaced whole.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
