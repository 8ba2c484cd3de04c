//! WebRTC transport: peer connection setup, SDP negotiation over HTTP, and
//! the single control data channel.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;
use url::Url;
use webrtc::api::APIBuilder;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::protocol::client_events::ClientEvent;
use crate::transport::audio::AudioSource;
use crate::transport::{Transport, TransportConnector, TransportEvent};

/// Default negotiation endpoint, model selection included in the query.
pub const DEFAULT_NEGOTIATION_URL: &str = "https://api.openai.com/v1/realtime?model=gpt-realtime";

/// Default STUN server used when the caller supplies none.
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Label of the one control channel; both sides agree on it out of band.
pub const CONTROL_CHANNEL_LABEL: &str = "events";

const EVENT_BUFFER: usize = 64;

/// Connection parameters for [`RtcTransport`].
#[derive(Debug, Clone)]
pub struct RtcConfig {
    /// Where the SDP offer is POSTed.
    pub negotiation_url: String,
    /// Bearer credential for the negotiation endpoint.
    pub credential: String,
    /// STUN/TURN server URLs.
    pub ice_servers: Vec<String>,
}

impl RtcConfig {
    #[must_use]
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            negotiation_url: DEFAULT_NEGOTIATION_URL.to_string(),
            credential: credential.into(),
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }

    #[must_use]
    pub fn with_negotiation_url(mut self, url: impl Into<String>) -> Self {
        self.negotiation_url = url.into();
        self
    }
}

/// A connected WebRTC session: one peer connection, one outbound audio track,
/// one control data channel.
pub struct RtcTransport {
    peer: Arc<RTCPeerConnection>,
    channel: Arc<RTCDataChannel>,
    audio: Arc<dyn AudioSource>,
    events: mpsc::Receiver<TransportEvent>,
    remote_audio: Option<mpsc::Receiver<Arc<TrackRemote>>>,
    closed: bool,
}

impl RtcTransport {
    /// Build the peer connection, run SDP negotiation, and return the
    /// transport once the answer is applied.
    ///
    /// The control channel is created before the offer so it is part of the
    /// negotiated session; [`TransportEvent::ChannelOpen`] arrives later,
    /// once the channel actually opens.
    ///
    /// # Errors
    /// Fails on media acquisition, WebRTC setup, or a rejected offer
    /// ([`Error::Negotiation`]).
    pub async fn open(
        config: &RtcConfig,
        audio: Arc<dyn AudioSource>,
        device_id: Option<&str>,
    ) -> Result<Self> {
        let track = audio.open_track(device_id)?;

        let mut media = MediaEngine::default();
        media.register_default_codecs()?;
        let api = APIBuilder::new().with_media_engine(media).build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: config.ice_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let peer = Arc::new(api.new_peer_connection(rtc_config).await?);
        peer.add_track(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (track_tx, track_rx) = mpsc::channel(4);

        let channel = peer.create_data_channel(CONTROL_CHANNEL_LABEL, None).await?;
        wire_channel_callbacks(&channel, &event_tx);
        wire_peer_callbacks(&peer, &event_tx, track_tx);

        let offer = peer.create_offer(None).await?;
        let mut gather_complete = peer.gathering_complete_promise().await;
        peer.set_local_description(offer).await?;
        // Wait for the full candidate set so the offer can be sent in one
        // round trip, without trickle ICE.
        let _ = gather_complete.recv().await;

        let local = peer
            .local_description()
            .await
            .ok_or_else(|| Error::WebRtc(webrtc::Error::ErrConnectionClosed))?;

        let answer_sdp = negotiate(config, local.sdp).await?;
        let answer = RTCSessionDescription::answer(answer_sdp)?;
        peer.set_remote_description(answer).await?;

        Ok(Self {
            peer,
            channel,
            audio,
            events: event_rx,
            remote_audio: Some(track_rx),
            closed: false,
        })
    }

    /// Take the stream of inbound audio tracks. Yields each track the remote
    /// peer attaches; can only be taken once.
    pub fn take_remote_audio(&mut self) -> Option<mpsc::Receiver<Arc<TrackRemote>>> {
        self.remote_audio.take()
    }
}

/// POST the local offer and return the answer SDP.
async fn negotiate(config: &RtcConfig, offer_sdp: String) -> Result<String> {
    let client = reqwest::Client::new();
    let response = client
        .post(&config.negotiation_url)
        .header(CONTENT_TYPE, "application/sdp")
        .bearer_auth(&config.credential)
        .body(offer_sdp)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::Negotiation { status: status.as_u16(), body });
    }
    Ok(body)
}

fn wire_channel_callbacks(channel: &Arc<RTCDataChannel>, events: &mpsc::Sender<TransportEvent>) {
    let tx = events.clone();
    channel.on_open(Box::new(move || {
        Box::pin(async move {
            let _ = tx.send(TransportEvent::ChannelOpen).await;
        })
    }));

    let tx = events.clone();
    channel.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx.clone();
        Box::pin(async move {
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => {
                    let _ = tx.send(TransportEvent::Message(text)).await;
                }
                Err(err) => {
                    tracing::warn!("discarding non-UTF-8 control frame: {err}");
                }
            }
        })
    }));

    let tx = events.clone();
    channel.on_error(Box::new(move |err| {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(TransportEvent::ChannelError(err.to_string())).await;
        })
    }));

    let tx = events.clone();
    channel.on_close(Box::new(move || {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(TransportEvent::Closed).await;
        })
    }));
}

fn wire_peer_callbacks(
    peer: &Arc<RTCPeerConnection>,
    events: &mpsc::Sender<TransportEvent>,
    tracks: mpsc::Sender<Arc<TrackRemote>>,
) {
    let tx = events.clone();
    peer.on_track(Box::new(
        move |track: Arc<TrackRemote>, _receiver: Arc<RTCRtpReceiver>, _transceiver: Arc<RTCRtpTransceiver>| {
            let tx = tx.clone();
            let tracks = tracks.clone();
            Box::pin(async move {
                let id = track.id();
                tracing::debug!(track = %id, "remote track attached");
                let _ = tx.send(TransportEvent::TrackReceived { id }).await;
                let _ = tracks.send(track).await;
            })
        },
    ));

    let tx = events.clone();
    peer.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let tx = tx.clone();
        Box::pin(async move {
            if candidate.is_none() {
                let _ = tx.send(TransportEvent::IceGatheringComplete).await;
            }
        })
    }));
}

impl Transport for RtcTransport {
    fn send(&mut self, event: ClientEvent) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let payload = serde_json::to_string(&event)?;
            if self.closed || self.channel.ready_state() != RTCDataChannelState::Open {
                tracing::warn!("control channel not open, dropping outbound event");
                return Ok(());
            }
            if let Err(err) = self.channel.send_text(payload).await {
                tracing::warn!("control channel send failed: {err}");
            }
            Ok(())
        })
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<TransportEvent>> {
        Box::pin(async move {
            if self.closed {
                return None;
            }
            self.events.recv().await
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.closed {
                return;
            }
            self.closed = true;
            if let Err(err) = self.peer.close().await {
                tracing::warn!("peer connection close failed: {err}");
            }
            self.audio.release();
        })
    }

    fn is_open(&self) -> bool {
        !self.closed && self.channel.ready_state() == RTCDataChannelState::Open
    }
}

/// Connects [`RtcTransport`]s from a config and an audio source.
pub struct RtcConnector {
    config: RtcConfig,
    audio: Arc<dyn AudioSource>,
}

impl std::fmt::Debug for RtcConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtcConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RtcConnector {
    /// # Errors
    /// Rejects an empty credential or an invalid negotiation URL up front,
    /// before any media or network work happens.
    pub fn new(config: RtcConfig, audio: Arc<dyn AudioSource>) -> Result<Self> {
        if config.credential.is_empty() {
            return Err(Error::MissingCredential);
        }
        Url::parse(&config.negotiation_url)?;
        Ok(Self { config, audio })
    }
}

impl TransportConnector for RtcConnector {
    fn open(&mut self, device_id: Option<&str>) -> BoxFuture<'_, Result<Box<dyn Transport>>> {
        let device_id = device_id.map(str::to_owned);
        Box::pin(async move {
            let audio = Arc::clone(&self.audio);
            let transport =
                RtcTransport::open(&self.config, audio, device_id.as_deref()).await?;
            Ok(Box::new(transport) as Box<dyn Transport>)
        })
    }
}
