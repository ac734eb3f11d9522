//! Secondary headset fan-out: one peer connection per announced device.
//!
//! This crate does not bind to a specific WebRTC runtime. Peer connections,
//! signaling channels and the local media stream come in through the traits
//! in [`webrtc`] and [`media`]; enable `webrtc-runtime` for a webrtc-rs backed
//! factory.

#![forbid(unsafe_code)]

mod config;
pub mod coordinator;
pub mod loopback;
pub mod media;
pub mod signaling;
pub mod webrtc;
#[cfg(feature = "webrtc-runtime")]
pub mod webrtc_rs;

pub use config::{PeerConfig, DEFAULT_STUN_SERVER, ICE_SERVERS_ENV};
pub use coordinator::{HeadsetEntry, MultiPeerCoordinator, PeerSession};
pub use loopback::{LoopbackPeer, LoopbackPeerFactory};
pub use media::{MediaStream, MediaTrack, StreamSource, TrackKind};
pub use signaling::{LocalSignaling, OutboundSignal};
pub use webrtc::{
    IceCandidateHandler, PeerConnection, PeerConnectionFactory, SignalingChannel,
    SignalingConnector,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("signaling error: {0}")]
    Signaling(String),
    #[error("peer connection error: {0}")]
    Peer(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type WebResult<T> = Result<T, WebError>;
