//! XR session lifecycle and frame loop.
//!
//! States: Idle -> Requesting -> Active -> Idle. At most one session exists
//! at a time. An active session is driven by a dedicated frame loop thread
//! which owns the session handle and stops when its stop flag is raised or
//! when the runtime reports the session ended.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};
use std::thread::JoinHandle;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    runtime::{EndSignal, FrameHandler, XrRuntime, XrSession},
    status,
    types::{ReferenceSpace, ReferenceSpaceKind, SessionInit, XrMode},
    XrError, XrResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Active,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Active => "active",
        }
    }
}

struct Slot {
    state: SessionState,
    mode: Option<XrMode>,
    space: Option<ReferenceSpace>,
    session_id: Option<Uuid>,
    stop: Option<Arc<AtomicBool>>,
    wake: Option<EndSignal>,
}

impl Slot {
    fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            mode: None,
            space: None,
            session_id: None,
            stop: None,
            wake: None,
        }
    }
}

pub struct SessionManager {
    runtime: Arc<dyn XrRuntime>,
    slot: Arc<Mutex<Slot>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(runtime: Arc<dyn XrRuntime>) -> Self {
        Self {
            runtime,
            slot: Arc::new(Mutex::new(Slot::idle())),
            thread: Mutex::new(None),
        }
    }

    pub fn runtime(&self) -> &Arc<dyn XrRuntime> {
        &self.runtime
    }

    pub fn state(&self) -> SessionState {
        lock(&self.slot).state
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    pub fn mode(&self) -> Option<XrMode> {
        lock(&self.slot).mode
    }

    pub fn reference_space(&self) -> Option<ReferenceSpace> {
        lock(&self.slot).space
    }

    /// Request an immersive session and start its frame loop.
    ///
    /// Failures to obtain the session or any reference space are returned to
    /// the caller; the manager is back in `Idle` afterwards.
    pub fn enter(&self, mode: XrMode, handler: Arc<dyn FrameHandler>) -> XrResult<()> {
        {
            let mut slot = lock(&self.slot);
            if slot.state != SessionState::Idle {
                return Err(XrError::SessionActive);
            }
            slot.state = SessionState::Requesting;
        }

        let init = SessionInit::for_mode(mode);
        let mut session = match self.runtime.request_session(mode, &init) {
            Ok(session) => session,
            Err(err) => {
                warn!("{} session request failed: {}", mode.as_str(), err);
                self.reset();
                return Err(err);
            }
        };

        let space = match acquire_reference_space(session.as_mut()) {
            Ok(space) => space,
            Err(err) => {
                session.end();
                self.reset();
                return Err(err);
            }
        };

        let session_id = Uuid::new_v4();
        let stop = Arc::new(AtomicBool::new(false));
        let wake = session.end_signal();
        handler.on_session_start(mode, space);

        let mut slot = lock(&self.slot);
        slot.state = SessionState::Active;
        slot.mode = Some(mode);
        slot.space = Some(space);
        slot.session_id = Some(session_id);
        slot.stop = Some(stop.clone());
        slot.wake = wake;

        let loop_slot = self.slot.clone();
        let spawned = std::thread::Builder::new()
            .name("xrcast-frame-loop".into())
            .spawn(move || {
                frame_loop(session, space, handler, stop, loop_slot, session_id);
            });

        match spawned {
            Ok(thread) => {
                *lock(&self.thread) = Some(thread);
                status::set_session_status(Some(mode));
                drop(slot);
                info!(
                    %session_id,
                    "{} session started in {} space",
                    mode.as_str(),
                    space.kind.as_str()
                );
                Ok(())
            }
            Err(err) => {
                *slot = Slot::idle();
                Err(XrError::Runtime(format!("failed to spawn frame loop: {err}")))
            }
        }
    }

    /// End the active session and wait for its frame loop to finish.
    ///
    /// A frame wait in progress is interrupted when the session offers an
    /// end signal. Returns `false` when there was nothing to close.
    pub fn close(&self) -> bool {
        let (stop, wake) = {
            let slot = lock(&self.slot);
            if slot.state != SessionState::Active {
                return false;
            }
            (slot.stop.clone(), slot.wake.clone())
        };

        if let Some(stop) = stop {
            stop.store(true, Ordering::Release);
        }
        if let Some(wake) = wake {
            wake();
        }
        self.wait_for_end();
        true
    }

    /// Wait for the frame loop of the current (or last) session to exit.
    pub fn wait_for_end(&self) {
        let thread = lock(&self.thread).take();
        if let Some(thread) = thread {
            join_loop(thread);
        }
    }

    fn reset(&self) {
        *lock(&self.slot) = Slot::idle();
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn join_loop(thread: JoinHandle<()>) {
    // Closing from inside a frame callback must not join the loop itself.
    if thread.thread().id() == std::thread::current().id() {
        return;
    }
    if thread.join().is_err() {
        error!("XR frame loop panicked");
    }
}

fn acquire_reference_space(session: &mut dyn XrSession) -> XrResult<ReferenceSpace> {
    match session.request_reference_space(ReferenceSpaceKind::LocalFloor) {
        Ok(space) => Ok(space),
        Err(err) => {
            warn!("local-floor reference space unavailable ({}), falling back to viewer", err);
            session.request_reference_space(ReferenceSpaceKind::Viewer)
        }
    }
}

fn frame_loop(
    mut session: Box<dyn XrSession>,
    space: ReferenceSpace,
    handler: Arc<dyn FrameHandler>,
    stop: Arc<AtomicBool>,
    slot: Arc<Mutex<Slot>>,
    session_id: Uuid,
) {
    let mut frames: u64 = 0;
    loop {
        if stop.load(Ordering::Acquire) {
            debug!(%session_id, "frame loop stop requested");
            break;
        }
        match session.wait_frame(&space) {
            Ok(Some(frame)) => {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                frames += 1;
                if let Err(err) = handler.on_frame(&frame) {
                    warn!(%session_id, "frame {} processing failed: {}", frames, err);
                }
            }
            Ok(None) if stop.load(Ordering::Acquire) => {
                debug!(%session_id, "frame wait interrupted by close");
                break;
            }
            Ok(None) => {
                info!(%session_id, "XR session ended by runtime");
                break;
            }
            Err(err) => {
                error!(%session_id, "XR frame wait failed: {}", err);
                break;
            }
        }
    }

    session.end();

    if lock(&slot).session_id != Some(session_id) {
        return;
    }

    info!(%session_id, frames, "XR session terminated");
    // Observers run before the slot reopens so a new session cannot overlap them.
    handler.on_session_end();

    let mut guard = lock(&slot);
    if guard.session_id == Some(session_id) {
        *guard = Slot::idle();
        status::set_session_status(None);
    }
}
