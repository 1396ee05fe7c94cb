//! Frame serialization and live fan-out to display clients.
//!
//! The decode loop writes into a shared `FrameStore`; this crate reads it
//! back out. The publisher snapshots the store, encodes the snapshot as JSON
//! and hands it to a [`BroadcastSink`]. The bundled sink is a [`Hub`] served
//! to browsers by [`WsServer`].

pub mod error;
pub mod hub;
pub mod message;
pub mod publisher;
pub mod server;
pub mod sink;

pub use error::{BroadcastError, Result};
pub use hub::Hub;
pub use message::{encode_snapshot, ChannelMessage, FrameMessage};
pub use publisher::{run_publisher, PublishPolicy, PublisherStats};
pub use server::{WsServer, DEFAULT_PATH};
pub use sink::BroadcastSink;
