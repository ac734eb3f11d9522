use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
}

/// The outgoing screen-share stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    /// A stream with one video track and, optionally, one audio track.
    pub fn screen_capture(id: impl Into<String>, with_audio: bool) -> Self {
        let id = id.into();
        let mut tracks = vec![MediaTrack {
            id: format!("{id}-video"),
            kind: TrackKind::Video,
            label: "screen".to_string(),
        }];
        if with_audio {
            tracks.push(MediaTrack {
                id: format!("{id}-audio"),
                kind: TrackKind::Audio,
                label: "system audio".to_string(),
            });
        }
        Self { id, tracks }
    }
}

/// Where the coordinator reads the current outgoing stream from.
pub trait StreamSource: Send + Sync {
    /// The active outgoing stream, if sharing has produced one.
    fn local_stream(&self) -> Option<MediaStream>;
}
