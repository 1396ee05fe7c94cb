use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// Destination for serialized frames.
///
/// Publishing is fire-and-forget: delivery to individual subscribers and
/// their ordering are the sink's business.
pub trait BroadcastSink: Send + Sync {
    /// Hand a serialized frame to subscribers. Returns how many were reached.
    fn publish(&self, payload: Bytes) -> Result<usize>;
}

impl<T: BroadcastSink + ?Sized> BroadcastSink for Arc<T> {
    fn publish(&self, payload: Bytes) -> Result<usize> {
        (**self).publish(payload)
    }
}

impl<T: BroadcastSink + ?Sized> BroadcastSink for &T {
    fn publish(&self, payload: Bytes) -> Result<usize> {
        (**self).publish(payload)
    }
}
