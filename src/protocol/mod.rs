//! Wire-level protocol for the realtime control channel.
//!
//! Outbound events are a closed set (`ClientEvent`); inbound events decode
//! tolerantly, collapsing unrecognized shapes into `ServerEvent::Unknown`
//! instead of failing the whole message.

pub mod client_events;
pub mod models;
pub mod server_events;
