use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("audio source unavailable: {0}")]
    MediaAcquisition(String),

    #[error("missing credential for the negotiation endpoint")]
    MissingCredential,

    #[error("negotiation failed: {status} {body}")]
    Negotiation { status: u16, body: String },

    #[error("tool catalog load failed: {0}")]
    CatalogLoad(String),

    #[error("tool call failed ({status}): {body}")]
    ToolInvocation { status: u16, body: String },

    #[error("WebRTC error: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("HTTP protocol error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse or serialize JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
