//! Registry of secondary headsets and their peer connections.
//!
//! Headsets are announced over an injected message port. Each announcement
//! opens the device's signaling channel, creates a peer connection carrying
//! every track of the local stream, and forwards local ICE candidates back
//! over that channel tagged with the device id.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use xrcast_common::{HostMessage, SignalMessage};

use crate::{
    config::PeerConfig,
    media::{MediaStream, StreamSource},
    webrtc::{
        IceCandidateHandler, PeerConnection, PeerConnectionFactory, SignalingChannel,
        SignalingConnector,
    },
    WebResult,
};

/// Per-device connection state.
pub struct PeerSession {
    pub device_id: String,
    pub channel: Arc<dyn SignalingChannel>,
    pub peer: Arc<dyn PeerConnection>,
    pub stream: Option<MediaStream>,
}

/// One entry of a bulk connect request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadsetEntry {
    pub id: String,
    pub connection: String,
}

pub struct MultiPeerCoordinator {
    config: PeerConfig,
    factory: Arc<dyn PeerConnectionFactory>,
    connector: Arc<dyn SignalingConnector>,
    streams: Arc<dyn StreamSource>,
    sessions: Mutex<HashMap<String, PeerSession>>,
}

impl MultiPeerCoordinator {
    pub fn new(
        config: PeerConfig,
        factory: Arc<dyn PeerConnectionFactory>,
        connector: Arc<dyn SignalingConnector>,
        streams: Arc<dyn StreamSource>,
    ) -> Self {
        Self {
            config,
            factory,
            connector,
            streams,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Consume host messages until the port closes.
    pub async fn run(self: Arc<Self>, mut port: mpsc::Receiver<HostMessage>) {
        while let Some(message) = port.recv().await {
            match message {
                HostMessage::NEW_HEADSET_CONNECTION {
                    headset_id,
                    connection,
                } => {
                    if let Err(err) = self.handle_announcement(&headset_id, &connection).await {
                        warn!("failed to connect headset {}: {}", headset_id, err);
                    }
                }
            }
        }
        debug!("headset message port closed");
    }

    /// Spawn [`Self::run`] on the current tokio runtime.
    pub fn spawn(self: &Arc<Self>, port: mpsc::Receiver<HostMessage>) -> JoinHandle<()> {
        tokio::spawn(self.clone().run(port))
    }

    /// Set up the peer connection for a newly announced headset.
    ///
    /// Announcing an id that is already connected replaces its session.
    pub async fn handle_announcement(&self, device_id: &str, connection: &str) -> WebResult<()> {
        info!("headset {} announced on {}", device_id, connection);
        let channel = self.connector.connect(connection).await?;
        let peer = self.factory.create(&self.config).await?;

        let stream = self.streams.local_stream();
        if let Some(stream) = &stream {
            for track in &stream.tracks {
                if let Err(err) = peer.add_track(track, stream).await {
                    close_quietly(device_id, peer.as_ref()).await;
                    return Err(err);
                }
            }
        }

        peer.on_ice_candidate(ice_forwarder(device_id, channel.clone()));

        let session = PeerSession {
            device_id: device_id.to_string(),
            channel,
            peer,
            stream,
        };
        let replaced = self
            .sessions
            .lock()
            .await
            .insert(device_id.to_string(), session);
        if let Some(previous) = replaced {
            debug!("replacing existing session for headset {}", device_id);
            close_quietly(device_id, previous.peer.as_ref()).await;
        }

        info!("peer connection configured for headset {}", device_id);
        Ok(())
    }

    /// Connect several headsets; failures are logged and skipped.
    ///
    /// Returns the ids that connected.
    pub async fn connect_many(&self, headsets: &[HeadsetEntry]) -> Vec<String> {
        info!("connecting {} headsets", headsets.len());
        let mut connected = Vec::with_capacity(headsets.len());
        for headset in headsets {
            match self
                .handle_announcement(&headset.id, &headset.connection)
                .await
            {
                Ok(()) => connected.push(headset.id.clone()),
                Err(err) => warn!("headset {} connection failed: {}", headset.id, err),
            }
        }
        connected
    }

    /// Close every peer connection and forget all headsets.
    ///
    /// Returns how many sessions were torn down.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<PeerSession> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().map(|(_, session)| session).collect()
        };
        for session in &drained {
            close_quietly(&session.device_id, session.peer.as_ref()).await;
        }
        if !drained.is_empty() {
            info!("closed {} headset connections", drained.len());
        }
        drained.len()
    }

    /// Connected device ids, sorted.
    pub async fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

fn ice_forwarder(device_id: &str, channel: Arc<dyn SignalingChannel>) -> IceCandidateHandler {
    let device_id = device_id.to_string();
    Arc::new(move |candidate| {
        let Some(candidate) = candidate else {
            debug!("ICE gathering complete for headset {}", device_id);
            return;
        };
        let message = SignalMessage::IceCandidate {
            candidate,
            headset_id: device_id.clone(),
        };
        let sent = serde_json::to_string(&message)
            .map_err(Into::into)
            .and_then(|text| channel.send(text));
        if let Err(err) = sent {
            warn!("failed to forward ICE candidate to {}: {}", device_id, err);
        }
    })
}

async fn close_quietly(device_id: &str, peer: &dyn PeerConnection) {
    if let Err(err) = peer.close().await {
        warn!("closing peer connection for {} failed: {}", device_id, err);
    }
}
