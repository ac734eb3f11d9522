//! webrtc-rs backed peer connections.

use std::sync::Arc;

use ::webrtc::api::media_engine::{MediaEngine, MIME_TYPE_H264, MIME_TYPE_OPUS};
use ::webrtc::api::{APIBuilder, API};
use ::webrtc::ice_transport::ice_server::RTCIceServer;
use ::webrtc::peer_connection::configuration::RTCConfiguration;
use ::webrtc::peer_connection::RTCPeerConnection;
use ::webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use ::webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use ::webrtc::track::track_local::TrackLocal;
use futures_util::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};
use xrcast_common::IceCandidate;

use crate::{
    config::PeerConfig,
    media::{MediaStream, MediaTrack, TrackKind},
    webrtc::{IceCandidateHandler, PeerConnection, PeerConnectionFactory},
    WebError, WebResult,
};

pub struct WebRtcPeerFactory {
    api: API,
}

impl WebRtcPeerFactory {
    pub fn new() -> WebResult<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()
            .map_err(|e| WebError::Peer(format!("codec registration failed: {e}")))?;
        let api = APIBuilder::new().with_media_engine(m).build();
        Ok(Self { api })
    }
}

impl PeerConnectionFactory for WebRtcPeerFactory {
    fn create<'a>(
        &'a self,
        config: &'a PeerConfig,
    ) -> BoxFuture<'a, WebResult<Arc<dyn PeerConnection>>> {
        async move {
            let rtc_config = RTCConfiguration {
                ice_servers: vec![RTCIceServer {
                    urls: config.ice_servers.clone(),
                    ..Default::default()
                }],
                ..Default::default()
            };
            let pc = self
                .api
                .new_peer_connection(rtc_config)
                .await
                .map_err(|e| WebError::Peer(e.to_string()))?;
            let peer: Arc<dyn PeerConnection> = Arc::new(WebRtcPeer {
                pc: Arc::new(pc),
                tracks: std::sync::Mutex::new(Vec::new()),
            });
            Ok(peer)
        }
        .boxed()
    }
}

pub struct WebRtcPeer {
    pc: Arc<RTCPeerConnection>,
    tracks: std::sync::Mutex<Vec<Arc<TrackLocalStaticSample>>>,
}

impl WebRtcPeer {
    /// Local tracks attached to this peer, for the media pipeline to write samples into.
    pub fn local_tracks(&self) -> Vec<Arc<TrackLocalStaticSample>> {
        self.tracks.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

fn mime_type(kind: TrackKind) -> &'static str {
    match kind {
        TrackKind::Video => MIME_TYPE_H264,
        TrackKind::Audio => MIME_TYPE_OPUS,
    }
}

impl PeerConnection for WebRtcPeer {
    fn add_track<'a>(
        &'a self,
        track: &'a MediaTrack,
        stream: &'a MediaStream,
    ) -> BoxFuture<'a, WebResult<()>> {
        async move {
            let local = Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: mime_type(track.kind).to_string(),
                    ..Default::default()
                },
                track.id.clone(),
                stream.id.clone(),
            ));
            self.pc
                .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .map_err(|e| WebError::Peer(format!("add_track {}: {e}", track.id)))?;
            if let Ok(mut tracks) = self.tracks.lock() {
                tracks.push(local);
            }
            debug!("added {:?} track {} to peer", track.kind, track.id);
            Ok(())
        }
        .boxed()
    }

    fn on_ice_candidate(&self, handler: IceCandidateHandler) {
        self.pc.on_ice_candidate(Box::new(move |c| {
            let handler = handler.clone();
            Box::pin(async move {
                let Some(candidate) = c else {
                    (*handler)(None);
                    return;
                };
                match candidate.to_json() {
                    Ok(init) => (*handler)(Some(IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_mline_index: init.sdp_mline_index,
                        username_fragment: init.username_fragment,
                    })),
                    Err(err) => warn!("failed to serialize local ICE candidate: {}", err),
                }
            })
        }));
    }

    fn close(&self) -> BoxFuture<'_, WebResult<()>> {
        async move {
            self.pc
                .close()
                .await
                .map_err(|e| WebError::Peer(e.to_string()))
        }
        .boxed()
    }
}
