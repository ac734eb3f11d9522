//! Hand gesture recognition from joint poses.
//!
//! Pinch and point are evaluated once per frame per hand. There is no
//! debouncing: a held pinch is reported on every frame it is held.

use glam::Vec3;
use tracing::debug;

use crate::types::{HandJointSet, Handedness, XrCommand, XrFrame};

pub const INDEX_TIP: &str = "index-finger-tip";
pub const INDEX_METACARPAL: &str = "index-finger-metacarpal";
pub const THUMB_TIP: &str = "thumb-tip";

/// Thumb to index tip distance (meters) below which the hand is pinching.
pub const PINCH_THRESHOLD_M: f32 = 0.02;

/// Index tip to metacarpal distance (meters) above which the finger is extended.
pub const POINT_EXTENSION_M: f32 = 0.08;

pub fn is_pinch(distance: f32) -> bool {
    distance < PINCH_THRESHOLD_M
}

pub fn is_extended(length: f32) -> bool {
    length > POINT_EXTENSION_M
}

fn joint_distance(joints: &HandJointSet, a: &str, b: &str) -> Option<f32> {
    let a = joints.get(a)?;
    let b = joints.get(b)?;
    Some(a.position.distance(b.position))
}

pub fn pinch_distance(joints: &HandJointSet) -> Option<f32> {
    joint_distance(joints, INDEX_TIP, THUMB_TIP)
}

pub fn is_pointing(joints: &HandJointSet) -> bool {
    joint_distance(joints, INDEX_TIP, INDEX_METACARPAL).is_some_and(is_extended)
}

/// Gestures for one hand this frame.
pub fn detect_gestures(hand: Handedness, joints: &HandJointSet) -> Vec<XrCommand> {
    let (Some(index_tip), Some(distance)) = (joints.get(INDEX_TIP), pinch_distance(joints)) else {
        return Vec::new();
    };
    let position: Vec3 = index_tip.position;

    let mut commands = Vec::new();
    if is_pinch(distance) {
        debug!("pinch detected ({})", hand.as_str());
        commands.push(XrCommand::Pinch { hand, position });
        if hand == Handedness::Right {
            commands.push(XrCommand::ToggleScreenShare);
        }
    }
    if is_pointing(joints) {
        debug!("point detected ({})", hand.as_str());
        commands.push(XrCommand::Point { hand, position });
    }
    commands
}

/// Latest joint sets per hand while hand tracking is enabled.
#[derive(Debug, Default)]
pub struct HandTracking {
    pub left: Option<HandJointSet>,
    pub right: Option<HandJointSet>,
}

impl HandTracking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hand(&self, hand: Handedness) -> Option<&HandJointSet> {
        match hand {
            Handedness::Left => self.left.as_ref(),
            Handedness::Right => self.right.as_ref(),
            Handedness::None => None,
        }
    }

    pub fn update(&mut self, frame: &XrFrame) -> Vec<XrCommand> {
        let mut commands = Vec::new();
        for source in &frame.input_sources {
            let Some(joints) = &source.hand else {
                continue;
            };
            let slot = match source.handedness {
                Handedness::Left => &mut self.left,
                Handedness::Right => &mut self.right,
                Handedness::None => continue,
            };
            *slot = Some(joints.clone());
            commands.extend(detect_gestures(source.handedness, joints));
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InputSourceFrame, JointPose};

    fn hand_with(thumb_gap: f32, extension: f32) -> HandJointSet {
        HandJointSet::new()
            .with_joint(INDEX_METACARPAL, JointPose::at(Vec3::ZERO))
            .with_joint(INDEX_TIP, JointPose::at(Vec3::new(0.0, 0.0, -extension)))
            .with_joint(
                THUMB_TIP,
                JointPose::at(Vec3::new(thumb_gap, 0.0, -extension)),
            )
    }

    #[test]
    fn test_pinch_threshold_is_exclusive() {
        assert!(!is_pinch(0.02));
        assert!(is_pinch(0.0199));
        assert!(!detect_gestures(Handedness::Left, &hand_with(0.02, 0.05))
            .iter()
            .any(|c| matches!(c, XrCommand::Pinch { .. })));
        assert!(detect_gestures(Handedness::Left, &hand_with(0.0199, 0.05))
            .iter()
            .any(|c| matches!(c, XrCommand::Pinch { .. })));
    }

    #[test]
    fn test_point_threshold_is_exclusive() {
        assert!(!is_extended(0.08));
        assert!(is_extended(0.081));
        assert!(!is_pointing(&hand_with(0.05, 0.08)));
        assert!(is_pointing(&hand_with(0.05, 0.081)));
    }

    #[test]
    fn test_right_pinch_toggles_share() {
        let commands = detect_gestures(Handedness::Right, &hand_with(0.01, 0.05));
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            commands[0],
            XrCommand::Pinch {
                hand: Handedness::Right,
                ..
            }
        ));
        assert_eq!(commands[1], XrCommand::ToggleScreenShare);

        let left = detect_gestures(Handedness::Left, &hand_with(0.01, 0.05));
        assert!(!left.contains(&XrCommand::ToggleScreenShare));
    }

    #[test]
    fn test_missing_tips_yield_nothing() {
        let joints = HandJointSet::new().with_joint(INDEX_TIP, JointPose::at(Vec3::ZERO));
        assert!(detect_gestures(Handedness::Right, &joints).is_empty());
    }

    #[test]
    fn test_held_pinch_fires_every_frame() {
        let mut tracking = HandTracking::new();
        let frame = XrFrame {
            input_sources: vec![InputSourceFrame {
                id: 3,
                handedness: Handedness::Right,
                hand: Some(hand_with(0.005, 0.05)),
                ..Default::default()
            }],
            ..Default::default()
        };
        for _ in 0..3 {
            let commands = tracking.update(&frame);
            assert!(commands.contains(&XrCommand::ToggleScreenShare));
        }
        assert!(tracking.hand(Handedness::Right).is_some());
        assert!(tracking.hand(Handedness::Left).is_none());
    }
}
