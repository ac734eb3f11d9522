//! Loopback peer connections for headless runs and tests.
//!
//! A loopback peer gathers a single host candidate as soon as an ICE handler
//! is installed and records the tracks it was given.

use std::sync::{
    atomic::{AtomicBool, AtomicU16, Ordering},
    Arc, Mutex,
};

use futures_util::future::{BoxFuture, FutureExt};
use xrcast_common::IceCandidate;

use crate::{
    config::PeerConfig,
    media::{MediaStream, MediaTrack},
    webrtc::{IceCandidateHandler, PeerConnection, PeerConnectionFactory},
    WebError, WebResult,
};

pub struct LoopbackPeer {
    port: u16,
    ice_servers: Vec<String>,
    tracks: Mutex<Vec<(String, String)>>,
    closed: AtomicBool,
}

impl LoopbackPeer {
    pub fn ice_servers(&self) -> &[String] {
        &self.ice_servers
    }

    /// `(stream id, track id)` pairs in the order they were added.
    pub fn tracks(&self) -> Vec<(String, String)> {
        self.tracks.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn host_candidate(&self) -> IceCandidate {
        IceCandidate {
            candidate: format!(
                "candidate:1 1 udp 2122260223 127.0.0.1 {} typ host",
                self.port
            ),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        }
    }
}

impl PeerConnection for LoopbackPeer {
    fn add_track<'a>(
        &'a self,
        track: &'a MediaTrack,
        stream: &'a MediaStream,
    ) -> BoxFuture<'a, WebResult<()>> {
        async move {
            if self.is_closed() {
                return Err(WebError::Peer("peer connection is closed".into()));
            }
            if let Ok(mut tracks) = self.tracks.lock() {
                tracks.push((stream.id.clone(), track.id.clone()));
            }
            Ok(())
        }
        .boxed()
    }

    fn on_ice_candidate(&self, handler: IceCandidateHandler) {
        (*handler)(Some(self.host_candidate()));
        (*handler)(None);
    }

    fn close(&self) -> BoxFuture<'_, WebResult<()>> {
        async move {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }
}

pub struct LoopbackPeerFactory {
    next_port: AtomicU16,
    peers: Mutex<Vec<Arc<LoopbackPeer>>>,
}

impl Default for LoopbackPeerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackPeerFactory {
    pub fn new() -> Self {
        Self {
            next_port: AtomicU16::new(50000),
            peers: Mutex::new(Vec::new()),
        }
    }

    /// Every peer created so far.
    pub fn peers(&self) -> Vec<Arc<LoopbackPeer>> {
        self.peers.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl PeerConnectionFactory for LoopbackPeerFactory {
    fn create<'a>(
        &'a self,
        config: &'a PeerConfig,
    ) -> BoxFuture<'a, WebResult<Arc<dyn PeerConnection>>> {
        async move {
            let peer = Arc::new(LoopbackPeer {
                port: self.next_port.fetch_add(1, Ordering::SeqCst),
                ice_servers: config.ice_servers.clone(),
                tracks: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            });
            if let Ok(mut peers) = self.peers.lock() {
                peers.push(peer.clone());
            }
            let peer: Arc<dyn PeerConnection> = peer;
            Ok(peer)
        }
        .boxed()
    }
}
