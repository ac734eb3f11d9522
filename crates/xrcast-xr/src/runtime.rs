use std::sync::Arc;

use crate::{
    types::{ReferenceSpace, ReferenceSpaceKind, SessionInit, XrFrame, XrMode},
    XrResult,
};

/// Wakes a session parked in [`XrSession::wait_frame`] so the wait returns `Ok(None)`.
pub type EndSignal = Arc<dyn Fn() + Send + Sync>;

/// Device-side XR services (browser `navigator.xr`, an OpenXR instance, ...).
pub trait XrRuntime: Send + Sync {
    /// Whether any XR runtime is present at all.
    fn is_available(&self) -> bool {
        true
    }

    fn is_session_supported(&self, mode: XrMode, required_features: &[&str]) -> XrResult<bool>;

    fn request_session(&self, mode: XrMode, init: &SessionInit) -> XrResult<Box<dyn XrSession>>;
}

/// An active immersive session. Owned by the frame loop.
pub trait XrSession: Send {
    fn request_reference_space(&mut self, kind: ReferenceSpaceKind) -> XrResult<ReferenceSpace>;

    /// Block until the next animation frame.
    ///
    /// Returns `Ok(None)` once the runtime has ended the session.
    fn wait_frame(&mut self, space: &ReferenceSpace) -> XrResult<Option<XrFrame>>;

    fn end(&mut self);

    /// A handle another thread can fire to cut a pending `wait_frame` short.
    fn end_signal(&self) -> Option<EndSignal> {
        None
    }
}

/// Receives session lifecycle and per-frame callbacks from the frame loop thread.
pub trait FrameHandler: Send + Sync {
    fn on_session_start(&self, _mode: XrMode, _space: ReferenceSpace) {}

    fn on_frame(&self, frame: &XrFrame) -> XrResult<()>;

    /// Called exactly once per session, however it ended.
    fn on_session_end(&self);
}
