use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const HOST_MESSAGE_TYPES: [&str; 1] = ["NEW_HEADSET_CONNECTION"];

/// Message delivered to the caster over the host messaging channel.
///
/// The host channel carries unrelated traffic too; use [`HostMessage::parse`]
/// to pick out the messages the caster understands.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
#[allow(non_camel_case_types)]
pub enum HostMessage {
    /// A secondary headset announced itself and the signaling endpoint to reach it on.
    NEW_HEADSET_CONNECTION {
        #[serde(rename = "headsetId")]
        headset_id: String,
        connection: String,
    },
}

impl HostMessage {
    /// Decode a host message, returning `None` for foreign or malformed payloads.
    pub fn parse(text: &str) -> Option<Self> {
        Self::decode(text).ok()
    }

    /// Decode a host message, distinguishing foreign message types from malformed ones.
    pub fn decode(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(|kind| kind.as_str())
            .ok_or_else(|| Error::protocol("host message without a type"))?;
        if !HOST_MESSAGE_TYPES.contains(&kind) {
            return Err(Error::protocol(format!("unsupported host message type {kind}")));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn new_headset(headset_id: impl Into<String>, connection: impl Into<String>) -> Self {
        Self::NEW_HEADSET_CONNECTION {
            headset_id: headset_id.into(),
            connection: connection.into(),
        }
    }
}

/// Message sent to a headset over its per-device signaling channel.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalMessage {
    /// Local ICE candidate gathered for the headset's peer connection.
    IceCandidate {
        candidate: IceCandidate,
        #[serde(rename = "headsetId")]
        headset_id: String,
    },
}

/// ICE candidate in the browser's `RTCIceCandidateInit` JSON shape.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}
