//! The enhanced XR feature set exposed to the surrounding caster.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use xrcast_web::{HeadsetEntry, MultiPeerCoordinator};
use xrcast_xr::{
    place_screen, probe, CapabilityReport, ControllerTracker, FrameHandler, FrameMetrics,
    HandTracking, MetricsSnapshot, Passthrough, ReferenceSpace, SessionManager, SessionState,
    VirtualScreenConfig, XrCommand, XrFrame, XrMode, XrResult, XrRuntime,
};

use crate::{
    persistence::{self, PersistedSession, SessionStore, SettingsControls},
    share::{ScreenShare, UserNotifier},
    ClientResult,
};

/// The caster-side services the feature set works against.
pub struct Collaborators {
    pub share: Arc<dyn ScreenShare>,
    pub notifier: Arc<dyn UserNotifier>,
    pub store: Arc<dyn SessionStore>,
    pub controls: Arc<dyn SettingsControls>,
}

#[derive(Default)]
struct FrameState {
    controllers: ControllerTracker,
    /// `Some` while hand tracking is enabled.
    hands: Option<HandTracking>,
    screen: Option<VirtualScreenConfig>,
    metrics: FrameMetrics,
    metrics_running: bool,
}

/// Per-frame work, run on the session's frame loop thread.
struct FrameRouter {
    state: Mutex<FrameState>,
    share: Arc<dyn ScreenShare>,
    notifier: Arc<dyn UserNotifier>,
}

impl FrameRouter {
    fn state(&self) -> MutexGuard<'_, FrameState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn dispatch(&self, command: XrCommand) {
        match command {
            XrCommand::ToggleScreenShare => {
                if self.share.is_sharing() {
                    self.share.stop_screen_share();
                } else if let Err(err) = self.share.start_screen_share() {
                    warn!("screen share start from XR failed: {}", err);
                }
            }
            XrCommand::Navigate { x, y } => debug!(x, y, "navigation"),
            XrCommand::Pinch { hand, position } => {
                debug!(hand = hand.as_str(), ?position, "pinch")
            }
            XrCommand::Point { hand, position } => {
                debug!(hand = hand.as_str(), ?position, "point")
            }
        }
    }
}

impl FrameHandler for FrameRouter {
    fn on_session_start(&self, _mode: XrMode, _space: ReferenceSpace) {
        let sharing = self.share.is_sharing();
        {
            let mut state = self.state();
            state.controllers.clear();
            state.metrics.reset();
            state.screen = sharing.then(VirtualScreenConfig::default);
        }
        if sharing {
            info!("continuing screen share inside the XR session");
        }
        self.notifier.session_changed(true);
    }

    fn on_frame(&self, frame: &XrFrame) -> XrResult<()> {
        let commands = {
            let mut state = self.state();
            let mut commands = state.controllers.update(frame);
            if let Some(hands) = state.hands.as_mut() {
                commands.extend(hands.update(frame));
            }
            if let Some(head) = &frame.viewer_pose {
                state.screen = Some(place_screen(head));
            }
            if state.metrics_running && state.metrics.record(frame.time_ms) {
                let snapshot = state.metrics.snapshot();
                info!(
                    frames = snapshot.frames,
                    frame_time_ms = snapshot.frame_time_ms,
                    frame_rate = snapshot.frame_rate,
                    dropped = snapshot.dropped_frames,
                    "VR metrics"
                );
            }
            commands
        };

        for command in commands {
            self.dispatch(command);
        }
        Ok(())
    }

    fn on_session_end(&self) {
        {
            let mut state = self.state();
            state.controllers.clear();
            if state.hands.is_some() {
                state.hands = Some(HandTracking::new());
            }
            state.screen = None;
        }
        info!("XR session ended");
        self.notifier.session_changed(false);
    }
}

pub struct EnhancedFeatures {
    sessions: Arc<SessionManager>,
    coordinator: Arc<MultiPeerCoordinator>,
    router: Arc<FrameRouter>,
    notifier: Arc<dyn UserNotifier>,
    store: Arc<dyn SessionStore>,
    controls: Arc<dyn SettingsControls>,
    user_agent: String,
    capabilities: Mutex<CapabilityReport>,
    passthrough: Mutex<Passthrough>,
}

impl EnhancedFeatures {
    pub fn new(
        runtime: Arc<dyn XrRuntime>,
        coordinator: Arc<MultiPeerCoordinator>,
        collaborators: Collaborators,
        user_agent: impl Into<String>,
    ) -> Self {
        let Collaborators {
            share,
            notifier,
            store,
            controls,
        } = collaborators;
        Self {
            sessions: Arc::new(SessionManager::new(runtime)),
            coordinator,
            router: Arc::new(FrameRouter {
                state: Mutex::new(FrameState::default()),
                share,
                notifier: notifier.clone(),
            }),
            notifier,
            store,
            controls,
            user_agent: user_agent.into(),
            capabilities: Mutex::new(CapabilityReport::unsupported()),
            passthrough: Mutex::new(Passthrough::default()),
        }
    }

    /// Probe the runtime and offer the matching controls.
    pub fn initialize(&self) -> CapabilityReport {
        let report = probe(self.sessions.runtime().as_ref());
        let affordances = report.affordances(&self.user_agent);
        self.notifier.capabilities(&report.summary(), &affordances);

        let passthrough = Passthrough::for_user_agent(&self.user_agent);
        if passthrough.available {
            info!("passthrough available on this device");
        }
        *lock(&self.passthrough) = passthrough;
        *lock(&self.capabilities) = report.clone();
        report
    }

    pub fn capabilities(&self) -> CapabilityReport {
        lock(&self.capabilities).clone()
    }

    /// Start an immersive session.
    pub fn enter(&self, mode: XrMode) -> ClientResult<()> {
        match self.sessions.enter(mode, self.router.clone()) {
            Ok(()) => {
                info!("{} session started", mode.as_str());
                Ok(())
            }
            Err(err) => {
                warn!("entering {} failed: {}", mode.as_str(), err);
                Err(err.into())
            }
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    pub fn is_session_active(&self) -> bool {
        self.sessions.is_active()
    }

    /// End the current session, if any, and wait for its frame loop.
    ///
    /// Blocks the calling thread; async callers use [`Self::exit_async`].
    pub fn exit(&self) -> bool {
        self.sessions.close()
    }

    /// [`Self::exit`] run on the blocking pool so the executor keeps going.
    pub async fn exit_async(&self) -> bool {
        close_off_executor("enhanced", {
            let sessions = self.sessions.clone();
            move || sessions.close()
        })
        .await
    }

    /// Wait for the current session to end on its own.
    pub fn wait_for_session_end(&self) {
        self.sessions.wait_for_end();
    }

    /// Returns whether hand tracking is enabled afterwards.
    pub fn toggle_hand_tracking(&self) -> bool {
        if !lock(&self.capabilities).supports("hand-tracking") {
            self.notifier.alert("Hand tracking is not supported");
            return false;
        }

        let mut state = self.router.state();
        state.hands = match state.hands.take() {
            Some(_) => {
                info!("hand tracking disabled");
                None
            }
            None => {
                info!("hand tracking enabled");
                Some(HandTracking::new())
            }
        };
        state.hands.is_some()
    }

    pub fn hand_tracking_enabled(&self) -> bool {
        self.router.state().hands.is_some()
    }

    /// Returns whether passthrough is enabled afterwards.
    pub fn toggle_passthrough(&self) -> bool {
        let active = self.sessions.is_active();
        let mut passthrough = lock(&self.passthrough);
        match passthrough.toggle(active) {
            Ok(enabled) => enabled,
            Err(err) => {
                debug!("passthrough toggle rejected: {}", err);
                self.notifier
                    .alert("Passthrough is not available on this device");
                false
            }
        }
    }

    pub fn passthrough(&self) -> Passthrough {
        *lock(&self.passthrough)
    }

    pub fn start_metrics(&self) {
        let mut state = self.router.state();
        if !state.metrics_running {
            state.metrics.reset();
            state.metrics_running = true;
            debug!("VR metrics collection started");
        }
    }

    pub fn stop_metrics(&self) {
        self.router.state().metrics_running = false;
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.router.state().metrics.snapshot()
    }

    pub fn virtual_screen(&self) -> Option<VirtualScreenConfig> {
        self.router.state().screen
    }

    pub fn controller_count(&self) -> usize {
        self.router.state().controllers.len()
    }

    pub fn coordinator(&self) -> &Arc<MultiPeerCoordinator> {
        &self.coordinator
    }

    /// Connect several secondary headsets; returns the ids that connected.
    pub async fn connect_multiple_headsets(&self, headsets: &[HeadsetEntry]) -> Vec<String> {
        let connected = self.coordinator.connect_many(headsets).await;
        info!("{} of {} headsets connected", connected.len(), headsets.len());
        connected
    }

    pub async fn save_session(&self) -> PersistedSession {
        let headsets = self.coordinator.device_ids().await;
        persistence::save(self.store.as_ref(), self.controls.as_ref(), headsets)
    }

    pub fn restore_session(&self) -> Option<PersistedSession> {
        persistence::restore(self.store.as_ref(), self.controls.as_ref())
    }

    /// Tear everything down and persist what was connected.
    pub async fn cleanup(&self) -> PersistedSession {
        self.stop_metrics();
        let headsets = self.coordinator.device_ids().await;

        if self.exit_async().await {
            debug!("XR session closed during cleanup");
        }
        let closed = self.coordinator.close_all().await;
        let saved = persistence::save(self.store.as_ref(), self.controls.as_ref(), headsets);
        info!(peers = closed, "XR resources cleaned up");
        saved
    }
}

/// Run a blocking session close on the blocking pool.
pub(crate) async fn close_off_executor<F>(what: &str, close: F) -> bool
where
    F: FnOnce() -> bool + Send + 'static,
{
    match tokio::task::spawn_blocking(close).await {
        Ok(closed) => closed,
        Err(err) => {
            warn!("{} session close did not finish: {}", what, err);
            false
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
