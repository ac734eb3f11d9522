//! The caster with enhanced XR entry and a fallback to the plain one.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use xrcast_common::HostMessage;
use xrcast_web::HeadsetEntry;
use xrcast_xr::{
    place_screen, FrameHandler, SessionManager, VirtualScreenConfig, XrError, XrFrame, XrMode,
    XrResult, XrRuntime,
};

use crate::{
    features::{close_off_executor, EnhancedFeatures},
    persistence::PersistedSession,
    ClientError, ClientResult,
};

/// A way of putting the user into VR.
pub trait VrEntry: Send + Sync {
    fn enter_vr(&self) -> ClientResult<()>;

    /// Whether a session this strategy started is still running.
    fn is_active(&self) -> bool {
        false
    }

    /// Leave VR if this strategy started it. Returns whether anything was closed.
    fn exit_vr(&self) -> bool {
        false
    }
}

/// Which strategy got the user into VR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPath {
    Enhanced,
    Base,
}

/// Plain VR entry: an immersive session showing the screen ahead of the viewer.
pub struct BaseVrEntry {
    sessions: SessionManager,
    screen: Arc<ScreenFollower>,
}

impl BaseVrEntry {
    pub fn new(runtime: Arc<dyn XrRuntime>) -> Self {
        Self {
            sessions: SessionManager::new(runtime),
            screen: Arc::new(ScreenFollower::default()),
        }
    }

    pub fn virtual_screen(&self) -> Option<VirtualScreenConfig> {
        self.screen.current()
    }
}

impl VrEntry for BaseVrEntry {
    fn enter_vr(&self) -> ClientResult<()> {
        self.sessions.enter(XrMode::Vr, self.screen.clone())?;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.sessions.is_active()
    }

    fn exit_vr(&self) -> bool {
        self.sessions.close()
    }
}

#[derive(Default)]
struct ScreenFollower {
    screen: Mutex<Option<VirtualScreenConfig>>,
}

impl ScreenFollower {
    fn current(&self) -> Option<VirtualScreenConfig> {
        self.screen.lock().map(|s| *s).unwrap_or_default()
    }

    fn set(&self, screen: Option<VirtualScreenConfig>) {
        if let Ok(mut current) = self.screen.lock() {
            *current = screen;
        }
    }
}

impl FrameHandler for ScreenFollower {
    fn on_frame(&self, frame: &XrFrame) -> XrResult<()> {
        if let Some(head) = &frame.viewer_pose {
            self.set(Some(place_screen(head)));
        }
        Ok(())
    }

    fn on_session_end(&self) {
        self.set(None);
    }
}

pub struct ExtendedCaster {
    features: Arc<EnhancedFeatures>,
    base: Arc<dyn VrEntry>,
}

impl ExtendedCaster {
    /// Compose the caster and restore the previously saved session.
    pub fn new(features: Arc<EnhancedFeatures>, base: Arc<dyn VrEntry>) -> Self {
        if features.restore_session().is_none() {
            info!("no saved VR session to restore");
        }
        Self { features, base }
    }

    pub fn features(&self) -> &Arc<EnhancedFeatures> {
        &self.features
    }

    /// Enter VR through the enhanced path, falling back to the base entry.
    ///
    /// Only one session runs across both paths. While either one is active
    /// this fails with [`XrError::SessionActive`] and nothing is requested.
    pub fn enter_vr(&self) -> ClientResult<EntryPath> {
        self.ensure_idle()?;
        match self.features.enter(XrMode::Vr) {
            Ok(()) => {
                self.features.start_metrics();
                Ok(EntryPath::Enhanced)
            }
            Err(err @ ClientError::Xr(XrError::SessionActive)) => Err(err),
            Err(err) => {
                warn!("enhanced VR entry failed ({}), using base entry", err);
                self.base.enter_vr()?;
                Ok(EntryPath::Base)
            }
        }
    }

    pub fn enter_ar(&self) -> ClientResult<()> {
        self.ensure_idle()?;
        self.features.enter(XrMode::Ar)
    }

    pub fn is_active(&self) -> bool {
        self.features.is_session_active() || self.base.is_active()
    }

    fn ensure_idle(&self) -> ClientResult<()> {
        if self.is_active() {
            return Err(XrError::SessionActive.into());
        }
        Ok(())
    }

    /// Start handling headset announcements from the host message port.
    pub fn listen(&self, port: mpsc::Receiver<HostMessage>) -> JoinHandle<()> {
        self.features.coordinator().spawn(port)
    }

    pub async fn connect_multiple_headsets(&self, headsets: &[HeadsetEntry]) -> Vec<String> {
        self.features.connect_multiple_headsets(headsets).await
    }

    /// Release every XR and peer resource, persisting the session first.
    pub async fn shutdown(&self) -> PersistedSession {
        let saved = self.features.cleanup().await;
        let base = self.base.clone();
        if close_off_executor("base", move || base.exit_vr()).await {
            info!("base VR session closed");
        }
        saved
    }
}
