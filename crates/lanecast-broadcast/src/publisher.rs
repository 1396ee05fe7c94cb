use std::sync::Arc;
use std::time::Duration;

use lanecast_frame::FrameStore;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::message::encode_snapshot;
use crate::sink::BroadcastSink;

/// Default cadence for [`PublishPolicy::Interval`].
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// When the publisher takes a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPolicy {
    /// After commits, coalescing bursts into a single publish.
    OnUpdate,
    /// On a fixed tick.
    Interval(Duration),
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self::Interval(DEFAULT_INTERVAL)
    }
}

/// Counters reported when the publisher stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublisherStats {
    pub published: u64,
    pub unchanged: u64,
    pub failed: u64,
}

struct Publisher<S> {
    store: Arc<FrameStore>,
    sink: S,
    last_sequence: Option<u64>,
    stats: PublisherStats,
}

impl<S: BroadcastSink> Publisher<S> {
    fn publish_if_changed(&mut self) {
        let snapshot = self.store.snapshot();
        let sequence = snapshot.sequence();
        if self.last_sequence == Some(sequence) {
            self.stats.unchanged += 1;
            return;
        }

        let payload = match encode_snapshot(&snapshot) {
            Ok(payload) => payload,
            Err(err) => {
                // Left unmarked so the next wakeup retries.
                warn!(sequence, error = %err, "failed to encode frame");
                self.stats.failed += 1;
                return;
            }
        };

        match self.sink.publish(payload) {
            Ok(subscribers) => {
                trace!(sequence, subscribers, "frame published");
                self.last_sequence = Some(sequence);
                self.stats.published += 1;
            }
            Err(err) => {
                warn!(sequence, error = %err, "failed to publish frame");
                self.stats.failed += 1;
            }
        }
    }
}

/// Snapshot `store` and hand each new frame to `sink` until `cancel` fires.
///
/// With [`PublishPolicy::OnUpdate`] the loop waits on `updates`, which the
/// decode loop notifies after every commit. A frame whose sequence has
/// already been published is not sent again.
pub async fn run_publisher<S: BroadcastSink>(
    store: Arc<FrameStore>,
    sink: S,
    policy: PublishPolicy,
    updates: Arc<Notify>,
    cancel: CancellationToken,
) -> PublisherStats {
    let mut publisher = Publisher {
        store,
        sink,
        last_sequence: None,
        stats: PublisherStats::default(),
    };
    debug!(?policy, "publisher started");

    match policy {
        PublishPolicy::OnUpdate => loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = updates.notified() => publisher.publish_if_changed(),
            }
        },
        PublishPolicy::Interval(period) => {
            let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => publisher.publish_if_changed(),
                }
            }
        }
    }

    let stats = publisher.stats;
    debug!(
        published = stats.published,
        unchanged = stats.unchanged,
        failed = stats.failed,
        "publisher stopped"
    );
    stats
}
