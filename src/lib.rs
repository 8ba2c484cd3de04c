//! Voice session bridge: WebRTC transport to a realtime speech model, with
//! MCP-style tool calls proxied over HTTP.
//!
//! The crate is built from three seams:
//! - [`ToolBridge`] loads a tool catalog and executes calls, translating
//!   between the model's flat tool names and the backend's dotted ones.
//! - [`RtcTransport`] owns the peer connection, the outbound audio track,
//!   and the single control data channel.
//! - [`SessionController`] runs the session state machine on top of both.
//!
//! ```no_run
//! use std::sync::Arc;
//! use voicebridge::{
//!     RtcConfig, RtcConnector, SessionController, StaticOpusSource, ToolBridge,
//! };
//!
//! # async fn run() -> voicebridge::Result<()> {
//! let bridge = ToolBridge::new("http://localhost:8808")?;
//! let connector = RtcConnector::new(
//!     RtcConfig::new(std::env::var("OPENAI_API_KEY").unwrap_or_default()),
//!     Arc::new(StaticOpusSource::new()),
//! )?;
//! let mut session = SessionController::new(Box::new(connector), Box::new(bridge));
//! session.start(None, Some("verse")).await?;
//! session.run().await;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

pub mod bridge;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod transport;

pub use bridge::{ToolBackend, ToolBridge, ToolCallRequest, ToolCallResult, ToolDescriptor};
pub use controller::{Notifier, SessionController, SessionState, TracingNotifier};
pub use error::{Error, Result};
pub use protocol::client_events::ClientEvent;
pub use protocol::models::{Item, SessionUpdate, Tool, ToolChoiceMode};
pub use protocol::server_events::{RemoteError, ServerEvent};
pub use transport::audio::{AudioSource, StaticOpusSource};
pub use transport::rtc::{RtcConfig, RtcConnector, RtcTransport};
pub use transport::{Transport, TransportConnector, TransportEvent};
