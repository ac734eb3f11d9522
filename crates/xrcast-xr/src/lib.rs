#![forbid(unsafe_code)]

pub mod capability;
pub mod dummy;
pub mod gesture;
pub mod input;
pub mod metrics;
pub mod passthrough;
pub mod runtime;
pub mod screen;
pub mod session;
pub mod status;
pub mod types;

pub use capability::{probe, Affordances, CapabilityReport, KNOWN_FEATURES};
pub use gesture::{HandTracking, PINCH_THRESHOLD_M, POINT_EXTENSION_M};
pub use input::{ControllerState, ControllerTracker, NAVIGATION_DEADZONE};
pub use metrics::{FrameMetrics, MetricsSnapshot};
pub use passthrough::{is_meta_device, Passthrough};
pub use runtime::{EndSignal, FrameHandler, XrRuntime, XrSession};
pub use screen::{place_screen, VirtualScreenConfig, COMFORT_DISTANCE_M};
pub use session::{SessionManager, SessionState};
pub use status::{current_status, xr_status, XrStatus};
pub use types::{
    GamepadButton, GamepadSnapshot, HandJointSet, Handedness, InputSourceFrame, JointPose, Pose,
    ReferenceSpace, ReferenceSpaceKind, SessionInit, XrCommand, XrFrame, XrMode,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum XrError {
    #[error("XR runtime unavailable: {0}")]
    Unavailable(String),
    #[error("not supported: {0}")]
    Unsupported(String),
    #[error("an XR session is already active")]
    SessionActive,
    #[error("session request refused: {0}")]
    SessionRefused(String),
    #[error("reference space unavailable: {0}")]
    ReferenceSpace(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type XrResult<T> = Result<T, XrError>;
