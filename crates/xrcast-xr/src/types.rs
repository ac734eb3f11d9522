use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::Serialize;

/// Immersive session flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum XrMode {
    Vr,
    Ar,
}

impl XrMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vr => "immersive-vr",
            Self::Ar => "immersive-ar",
        }
    }
}

/// Features passed along with a session request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInit {
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
}

impl SessionInit {
    pub fn for_mode(mode: XrMode) -> Self {
        let optional: &[&str] = match mode {
            XrMode::Vr => &["hand-tracking", "layers", "bounded-floor"],
            XrMode::Ar => &["hand-tracking", "light-estimation", "hit-test"],
        };
        Self {
            required_features: vec![ReferenceSpaceKind::LocalFloor.as_str().to_string()],
            optional_features: optional.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferenceSpaceKind {
    /// Floor-relative, origin at the user's starting position.
    LocalFloor,
    /// Head-relative.
    Viewer,
}

impl ReferenceSpaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalFloor => "local-floor",
            Self::Viewer => "viewer",
        }
    }
}

/// Coordinate frame that every pose in an [`XrFrame`] is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSpace {
    pub kind: ReferenceSpaceKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// Pose data for a single hand joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub position: Vec3,
    pub orientation: Quat,
    /// Joint radius in meters.
    pub radius: f32,
}

impl JointPose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            radius: 0.01,
        }
    }
}

/// Joint name (`index-finger-tip`, `thumb-tip`, ...) to pose, for one hand.
///
/// Joints the runtime could not resolve this frame are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandJointSet {
    joints: BTreeMap<String, JointPose>,
}

impl HandJointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_joint(mut self, name: &str, pose: JointPose) -> Self {
        self.insert(name, pose);
        self
    }

    pub fn insert(&mut self, name: &str, pose: JointPose) {
        self.joints.insert(name.to_string(), pose);
    }

    pub fn get(&self, name: &str) -> Option<&JointPose> {
        self.joints.get(name)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Handedness {
    #[default]
    None,
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GamepadButton {
    pub pressed: bool,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GamepadSnapshot {
    pub buttons: Vec<GamepadButton>,
    pub axes: Vec<f32>,
}

/// One input source as seen in a single frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputSourceFrame {
    pub id: u32,
    pub handedness: Handedness,
    /// Grip pose, `None` when it could not be resolved this frame.
    pub grip_pose: Option<Pose>,
    pub gamepad: Option<GamepadSnapshot>,
    /// Articulated hand joints for hand-tracked sources.
    pub hand: Option<HandJointSet>,
}

/// Everything the runtime reports for one animation frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XrFrame {
    pub time_ms: f64,
    pub viewer_pose: Option<Pose>,
    pub input_sources: Vec<InputSourceFrame>,
    /// Input sources connected since the previous frame.
    pub added: Vec<u32>,
    /// Input sources disconnected since the previous frame.
    pub removed: Vec<u32>,
}

/// High-level command produced by input and gesture processing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XrCommand {
    /// Start or stop the underlying screen share.
    ToggleScreenShare,
    Navigate { x: f32, y: f32 },
    Pinch { hand: Handedness, position: Vec3 },
    Point { hand: Handedness, position: Vec3 },
}
