use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::Result;
use crate::sink::BroadcastSink;

/// Default number of frames buffered per subscriber before it lags.
pub const DEFAULT_CAPACITY: usize = 16;

/// In-process fan-out of serialized frames.
///
/// The most recent payload is retained so that a subscriber joining between
/// updates can be shown the current state straight away.
#[derive(Clone)]
pub struct Hub {
    sender: broadcast::Sender<Bytes>,
    latest: Arc<Mutex<Option<Bytes>>>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe to future frames. Also returns the latest frame, if any.
    ///
    /// A frame published while subscribing may be delivered twice, never
    /// missed.
    pub fn subscribe(&self) -> (Option<Bytes>, broadcast::Receiver<Bytes>) {
        let receiver = self.sender.subscribe();
        (self.latest(), receiver)
    }

    /// The most recently published frame.
    pub fn latest(&self) -> Option<Bytes> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastSink for Hub {
    fn publish(&self, payload: Bytes) -> Result<usize> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload.clone());

        // Sending only fails when nobody is subscribed.
        let reached = self.sender.send(payload).unwrap_or(0);
        trace!(subscribers = reached, "frame published");
        Ok(reached)
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    use super::*;

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let hub = Hub::default();
        assert_eq!(hub.publish(Bytes::from_static(b"{}")).unwrap(), 0);
        assert_eq!(hub.latest().as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn subscriber_receives_published_frames() {
        let hub = Hub::default();
        let (latest, mut rx) = hub.subscribe();
        assert!(latest.is_none());
        assert_eq!(hub.subscriber_count(), 1);

        assert_eq!(hub.publish(Bytes::from_static(b"one")).unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap().as_ref(), b"one");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn late_subscriber_gets_latest_frame() {
        let hub = Hub::default();
        hub.publish(Bytes::from_static(b"first")).unwrap();
        hub.publish(Bytes::from_static(b"second")).unwrap();

        let (latest, mut rx) = hub.subscribe();
        assert_eq!(latest.as_deref(), Some(&b"second"[..]));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let hub = Hub::new(2);
        let (_, mut rx) = hub.subscribe();
        for i in 0..5u8 {
            hub.publish(Bytes::from(vec![i])).unwrap();
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(rx.recv().await.unwrap().as_ref(), &[3]);
    }
}
