//! Simulated XR runtime for headless runs and tests.

use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Condvar, Mutex, PoisonError,
};
use std::time::{Duration, Instant};

use glam::Vec3;

use crate::{
    runtime::{EndSignal, XrRuntime, XrSession},
    types::{
        GamepadButton, GamepadSnapshot, Handedness, InputSourceFrame, Pose, ReferenceSpace,
        ReferenceSpaceKind, SessionInit, XrFrame, XrMode,
    },
    XrError, XrResult,
};

/// Produces the frame with the given index. Poses are already resolved.
pub type FrameScript = Arc<dyn Fn(u64) -> XrFrame + Send + Sync>;

/// Input source id of the simulated right-hand controller.
pub const SIMULATED_CONTROLLER_ID: u32 = 1;

pub struct SimulatedRuntime {
    available: bool,
    features: HashSet<String>,
    failing_features: HashSet<String>,
    refuse_sessions: bool,
    local_floor: bool,
    viewer_space: bool,
    frame_limit: Option<u64>,
    fps: f64,
    stalled: bool,
    script: FrameScript,
    requested: Arc<AtomicUsize>,
    ended: Arc<AtomicUsize>,
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRuntime {
    /// A runtime that supports immersive VR with floor-relative tracking.
    pub fn new() -> Self {
        Self {
            available: true,
            features: ["immersive-vr", "local-floor"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
            failing_features: HashSet::new(),
            refuse_sessions: false,
            local_floor: true,
            viewer_space: true,
            frame_limit: None,
            fps: 0.0,
            stalled: false,
            script: Arc::new(idle_frame),
            requested: Arc::new(AtomicUsize::new(0)),
            ended: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_features(mut self, features: &[&str]) -> Self {
        self.features = features.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Make the support check for `feature` fail instead of answering.
    pub fn with_failing_feature(mut self, feature: &str) -> Self {
        self.failing_features.insert(feature.to_string());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn refusing_sessions(mut self) -> Self {
        self.refuse_sessions = true;
        self
    }

    pub fn without_local_floor(mut self) -> Self {
        self.local_floor = false;
        self
    }

    pub fn without_viewer_space(mut self) -> Self {
        self.viewer_space = false;
        self
    }

    /// End each session after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Pace frames at `fps`; `0` delivers them back to back.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Never deliver a frame; `wait_frame` parks until the session is ended.
    pub fn with_stalled_frames(mut self) -> Self {
        self.stalled = true;
        self
    }

    pub fn with_script(mut self, script: FrameScript) -> Self {
        self.script = script;
        self
    }

    pub fn sessions_requested(&self) -> usize {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn sessions_ended(&self) -> usize {
        self.ended.load(Ordering::SeqCst)
    }
}

impl XrRuntime for SimulatedRuntime {
    fn is_available(&self) -> bool {
        self.available
    }

    fn is_session_supported(&self, mode: XrMode, required_features: &[&str]) -> XrResult<bool> {
        if !self.available {
            return Err(XrError::Unavailable("simulated runtime disabled".into()));
        }
        let mut wanted = vec![mode.as_str()];
        wanted.extend_from_slice(required_features);
        for feature in &wanted {
            if self.failing_features.contains(*feature) {
                return Err(XrError::Runtime(format!("support check for {feature} failed")));
            }
        }
        Ok(wanted.iter().all(|feature| self.features.contains(*feature)))
    }

    fn request_session(&self, mode: XrMode, init: &SessionInit) -> XrResult<Box<dyn XrSession>> {
        self.requested.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(XrError::Unavailable("simulated runtime disabled".into()));
        }
        if self.refuse_sessions {
            return Err(XrError::SessionRefused("user declined the session".into()));
        }
        if !self.features.contains(mode.as_str()) {
            return Err(XrError::Unsupported(mode.as_str().to_string()));
        }
        if let Some(missing) = init
            .required_features
            .iter()
            .find(|feature| !self.features.contains(feature.as_str()))
        {
            return Err(XrError::Unsupported(format!("required feature {missing}")));
        }

        Ok(Box::new(SimulatedSession {
            local_floor: self.local_floor,
            viewer_space: self.viewer_space,
            frame_limit: self.frame_limit,
            frame_interval: (self.fps > 0.0).then(|| Duration::from_secs_f64(1.0 / self.fps)),
            stalled: self.stalled,
            latch: Arc::new(EndLatch::default()),
            script: self.script.clone(),
            ended_counter: self.ended.clone(),
            start: Instant::now(),
            seq: 0,
            ended: false,
        }))
    }
}

struct SimulatedSession {
    local_floor: bool,
    viewer_space: bool,
    frame_limit: Option<u64>,
    frame_interval: Option<Duration>,
    stalled: bool,
    latch: Arc<EndLatch>,
    script: FrameScript,
    ended_counter: Arc<AtomicUsize>,
    start: Instant,
    seq: u64,
    ended: bool,
}

impl XrSession for SimulatedSession {
    fn request_reference_space(&mut self, kind: ReferenceSpaceKind) -> XrResult<ReferenceSpace> {
        let supported = match kind {
            ReferenceSpaceKind::LocalFloor => self.local_floor,
            ReferenceSpaceKind::Viewer => self.viewer_space,
        };
        if supported {
            Ok(ReferenceSpace { kind })
        } else {
            Err(XrError::ReferenceSpace(kind.as_str().to_string()))
        }
    }

    fn wait_frame(&mut self, _space: &ReferenceSpace) -> XrResult<Option<XrFrame>> {
        if self.ended
            || self.latch.is_set()
            || self.frame_limit.is_some_and(|limit| self.seq >= limit)
        {
            return Ok(None);
        }

        if self.stalled {
            self.latch.wait_until(None);
            return Ok(None);
        }

        if let Some(interval) = self.frame_interval {
            if let Some(target) = frame_target(self.start, interval, self.seq) {
                if self.latch.wait_until(Some(target)) {
                    return Ok(None);
                }
            }
        }

        let mut frame = (self.script)(self.seq);
        if self.frame_interval.is_some() {
            frame.time_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        }
        self.seq += 1;
        Ok(Some(frame))
    }

    fn end(&mut self) {
        if !self.ended {
            self.ended = true;
            self.ended_counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn end_signal(&self) -> Option<EndSignal> {
        let latch = self.latch.clone();
        Some(Arc::new(move || latch.set()))
    }
}

/// One-shot flag a parked frame wait can be woken by.
#[derive(Default)]
struct EndLatch {
    set: Mutex<bool>,
    cond: Condvar,
}

impl EndLatch {
    fn set(&self) {
        *self.set.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cond.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Park until the latch is set or `deadline` passes. Returns whether it was set.
    fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        while !*set {
            match deadline {
                None => set = self.cond.wait(set).unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let Some(timeout) = deadline.checked_duration_since(Instant::now()) else {
                        break;
                    };
                    set = self
                        .cond
                        .wait_timeout(set, timeout)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
        *set
    }
}

/// When frame `seq` is due. `None` if the offset does not fit an `Instant`.
fn frame_target(start: Instant, interval: Duration, seq: u64) -> Option<Instant> {
    Duration::try_from_secs_f64(interval.as_secs_f64() * seq as f64)
        .ok()
        .and_then(|offset| start.checked_add(offset))
}

/// Default script: a standing viewer holding one idle right-hand controller.
pub fn idle_frame(seq: u64) -> XrFrame {
    XrFrame {
        time_ms: seq as f64 * (1000.0 / 72.0),
        viewer_pose: Some(Pose::at(Vec3::new(0.0, 1.6, 0.0))),
        input_sources: vec![InputSourceFrame {
            id: SIMULATED_CONTROLLER_ID,
            handedness: Handedness::Right,
            grip_pose: Some(Pose::at(Vec3::new(0.25, 1.2, -0.3))),
            gamepad: Some(GamepadSnapshot {
                buttons: vec![GamepadButton::default(); 2],
                axes: vec![0.0; 4],
            }),
            hand: None,
        }],
        added: if seq == 0 {
            vec![SIMULATED_CONTROLLER_ID]
        } else {
            Vec::new()
        },
        removed: Vec::new(),
    }
}
