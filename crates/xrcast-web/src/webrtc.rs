use std::sync::Arc;

use futures_util::future::BoxFuture;
use xrcast_common::IceCandidate;

use crate::{
    config::PeerConfig,
    media::{MediaStream, MediaTrack},
    WebResult,
};

/// Called with each local ICE candidate; `None` marks the end of gathering.
pub type IceCandidateHandler = Arc<dyn Fn(Option<IceCandidate>) + Send + Sync>;

/// One peer connection to a secondary headset.
pub trait PeerConnection: Send + Sync {
    fn add_track<'a>(
        &'a self,
        track: &'a MediaTrack,
        stream: &'a MediaStream,
    ) -> BoxFuture<'a, WebResult<()>>;

    fn on_ice_candidate(&self, handler: IceCandidateHandler);

    fn close(&self) -> BoxFuture<'_, WebResult<()>>;
}

pub trait PeerConnectionFactory: Send + Sync {
    fn create<'a>(
        &'a self,
        config: &'a PeerConfig,
    ) -> BoxFuture<'a, WebResult<Arc<dyn PeerConnection>>>;
}

/// Out-of-band transport to one headset.
pub trait SignalingChannel: Send + Sync {
    fn send(&self, text: String) -> WebResult<()>;
}

/// Opens the signaling channel named in a headset announcement.
pub trait SignalingConnector: Send + Sync {
    fn connect<'a>(&'a self, endpoint: &'a str)
        -> BoxFuture<'a, WebResult<Arc<dyn SignalingChannel>>>;
}
