//! Local audio capture seam.
//!
//! Acquiring a microphone is platform work that lives outside this crate; the
//! transport only needs a sendable track and a way to release it when the
//! session ends.

use std::sync::Arc;

use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::error::Result;

/// Supplies the outbound audio track attached before negotiation.
pub trait AudioSource: Send + Sync {
    /// Open a track for the given capture device, or the default device when
    /// `device_id` is `None`.
    ///
    /// # Errors
    /// Returns [`crate::Error::MediaAcquisition`] when no usable device is
    /// available.
    fn open_track(&self, device_id: Option<&str>) -> Result<Arc<TrackLocalStaticSample>>;

    /// Release any capture resources held for the last opened track.
    fn release(&self);
}

/// An [`AudioSource`] backed by a caller-fed Opus sample track.
///
/// The owner writes samples into the track it gets from [`Self::track`];
/// there is no device handling, so `release` is a no-op.
pub struct StaticOpusSource {
    track: Arc<TrackLocalStaticSample>,
}

impl StaticOpusSource {
    #[must_use]
    pub fn new() -> Self {
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            "voicebridge-mic".to_owned(),
        ));
        Self { track }
    }

    /// The track callers feed captured samples into.
    #[must_use]
    pub fn track(&self) -> Arc<TrackLocalStaticSample> {
        Arc::clone(&self.track)
    }
}

impl Default for StaticOpusSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for StaticOpusSource {
    fn open_track(&self, _device_id: Option<&str>) -> Result<Arc<TrackLocalStaticSample>> {
        Ok(Arc::clone(&self.track))
    }

    fn release(&self) {}
}
