//! Transport seam between the session controller and the wire.
//!
//! The controller only ever talks to [`Transport`] and [`TransportConnector`];
//! the WebRTC implementation lives in [`rtc`], and tests substitute in-memory
//! doubles.

use futures::future::BoxFuture;

use crate::error::Result;
use crate::protocol::client_events::ClientEvent;

pub mod audio;
pub mod rtc;

/// Lifecycle and payload notifications surfaced by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The control channel finished opening and can carry events.
    ChannelOpen,
    /// The control channel reported an error.
    ChannelError(String),
    /// ICE candidate gathering finished for the local description.
    IceGatheringComplete,
    /// The remote peer attached a media track.
    TrackReceived { id: String },
    /// A raw text frame arrived on the control channel.
    Message(String),
    /// The transport shut down; no further events will follow.
    Closed,
}

/// An established session transport.
pub trait Transport: Send {
    /// Serialize and send one event over the control channel.
    fn send(&mut self, event: ClientEvent) -> BoxFuture<'_, Result<()>>;

    /// Wait for the next transport event. `None` means the transport is done.
    fn next_event(&mut self) -> BoxFuture<'_, Option<TransportEvent>>;

    /// Tear the transport down. Safe to call more than once.
    fn close(&mut self) -> BoxFuture<'_, ()>;

    /// Whether the control channel is currently open.
    fn is_open(&self) -> bool;
}

/// Factory that negotiates and yields a connected [`Transport`].
pub trait TransportConnector: Send {
    fn open(&mut self, device_id: Option<&str>) -> BoxFuture<'_, Result<Box<dyn Transport>>>;
}
