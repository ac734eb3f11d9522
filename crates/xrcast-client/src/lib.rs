//! Enhanced XR screen casting on top of the base caster.
//!
//! [`EnhancedFeatures`] drives the immersive session, routes controller and
//! hand gestures to the screen-share collaborator, fans the shared stream out
//! to secondary headsets and persists the user's settings between runs.
//! [`ExtendedCaster`] composes it with a base VR entry strategy and falls
//! back to that strategy when the enhanced path fails.

#![forbid(unsafe_code)]

pub mod caster;
mod config;
pub mod features;
pub mod persistence;
pub mod share;

pub use caster::{BaseVrEntry, EntryPath, ExtendedCaster, VrEntry};
pub use config::{CasterConfig, STORE_DIR_ENV, USER_AGENT_ENV};
pub use features::{Collaborators, EnhancedFeatures};
pub use persistence::{
    FileStore, MemoryStore, PersistedSession, SessionSettings, SessionStore, SettingsControls,
    SettingsForm, SESSION_KEY,
};
pub use share::{LogNotifier, ScreenShare, ShareStream, SimulatedShare, UserNotifier};

use thiserror::Error;
use xrcast_web::WebError;
use xrcast_xr::XrError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Xr(#[from] XrError),
    #[error(transparent)]
    Web(#[from] WebError),
    #[error("screen share error: {0}")]
    Share(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
