//! Controller tracking and button/axis mapping.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{GamepadSnapshot, Handedness, Pose, XrCommand, XrFrame};

/// Axis magnitude a thumbstick must exceed before it counts as navigation.
pub const NAVIGATION_DEADZONE: f32 = 0.5;

/// Gamepad button index of the trigger.
pub const TRIGGER_BUTTON: usize = 0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerState {
    pub id: u32,
    pub handedness: Handedness,
    pub grip_pose: Option<Pose>,
    pub gamepad: Option<GamepadSnapshot>,
}

/// Connected controllers of the current session, keyed by input source id.
#[derive(Debug, Default)]
pub struct ControllerTracker {
    controllers: BTreeMap<u32, ControllerState>,
}

impl ControllerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&ControllerState> {
        self.controllers.get(&id)
    }

    pub fn clear(&mut self) {
        self.controllers.clear();
    }

    /// Apply connection changes, refresh poses and map input to commands.
    pub fn update(&mut self, frame: &XrFrame) -> Vec<XrCommand> {
        for id in &frame.added {
            let handedness = frame
                .input_sources
                .iter()
                .find(|source| source.id == *id)
                .map(|source| source.handedness)
                .unwrap_or_default();
            debug!("controller {} added ({})", id, handedness.as_str());
            self.controllers.insert(
                *id,
                ControllerState {
                    id: *id,
                    handedness,
                    ..Default::default()
                },
            );
        }
        for id in &frame.removed {
            if self.controllers.remove(id).is_some() {
                debug!("controller {} removed", id);
            }
        }

        let mut commands = Vec::new();
        for source in &frame.input_sources {
            let Some(state) = self.controllers.get_mut(&source.id) else {
                continue;
            };
            let Some(pose) = source.grip_pose else {
                continue;
            };
            state.grip_pose = Some(pose);
            state.gamepad = source.gamepad.clone();
            if let Some(gamepad) = &source.gamepad {
                commands.extend(map_gamepad(gamepad, &pose));
            }
        }
        commands
    }
}

fn map_gamepad(gamepad: &GamepadSnapshot, pose: &Pose) -> Vec<XrCommand> {
    let mut commands = Vec::new();
    if gamepad
        .buttons
        .get(TRIGGER_BUTTON)
        .is_some_and(|button| button.pressed)
    {
        debug!("trigger pressed at {:?}", pose.position);
        commands.push(XrCommand::ToggleScreenShare);
    }
    if let Some((x, y)) = navigation_intent(&gamepad.axes) {
        commands.push(XrCommand::Navigate { x, y });
    }
    commands
}

/// Primary 2-axis input, when either axis leaves the deadzone.
pub fn navigation_intent(axes: &[f32]) -> Option<(f32, f32)> {
    let [x, y, ..] = axes else {
        return None;
    };
    if x.abs() > NAVIGATION_DEADZONE || y.abs() > NAVIGATION_DEADZONE {
        Some((*x, *y))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GamepadButton, InputSourceFrame};
    use glam::Vec3;

    fn controller(id: u32, trigger: bool, axes: Vec<f32>) -> InputSourceFrame {
        InputSourceFrame {
            id,
            handedness: Handedness::Right,
            grip_pose: Some(Pose::at(Vec3::new(0.2, 1.1, -0.3))),
            gamepad: Some(GamepadSnapshot {
                buttons: vec![GamepadButton {
                    pressed: trigger,
                    value: if trigger { 1.0 } else { 0.0 },
                }],
                axes,
            }),
            hand: None,
        }
    }

    #[test]
    fn test_deadzone_is_exclusive() {
        assert_eq!(navigation_intent(&[0.5, 0.0]), None);
        assert_eq!(navigation_intent(&[0.0, -0.5]), None);
        assert_eq!(navigation_intent(&[0.51, 0.0]), Some((0.51, 0.0)));
        assert_eq!(navigation_intent(&[0.0, -0.51]), Some((0.0, -0.51)));
        assert_eq!(navigation_intent(&[0.9]), None);
    }

    #[test]
    fn test_added_controller_maps_trigger_and_stick() {
        let mut tracker = ControllerTracker::new();
        let frame = XrFrame {
            input_sources: vec![controller(1, true, vec![0.0, 0.8])],
            added: vec![1],
            ..Default::default()
        };
        let commands = tracker.update(&frame);
        assert_eq!(
            commands,
            vec![
                XrCommand::ToggleScreenShare,
                XrCommand::Navigate { x: 0.0, y: 0.8 }
            ]
        );
        assert_eq!(tracker.get(1).unwrap().handedness, Handedness::Right);
    }

    #[test]
    fn test_unannounced_or_unposed_sources_are_ignored() {
        let mut tracker = ControllerTracker::new();
        let frame = XrFrame {
            input_sources: vec![controller(7, true, vec![])],
            ..Default::default()
        };
        assert!(tracker.update(&frame).is_empty());

        let mut unposed = controller(2, true, vec![]);
        unposed.grip_pose = None;
        let frame = XrFrame {
            input_sources: vec![unposed],
            added: vec![2],
            ..Default::default()
        };
        assert!(tracker.update(&frame).is_empty());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_removed_controller_is_dropped() {
        let mut tracker = ControllerTracker::new();
        tracker.update(&XrFrame {
            input_sources: vec![controller(1, false, vec![])],
            added: vec![1],
            ..Default::default()
        });
        let commands = tracker.update(&XrFrame {
            input_sources: vec![controller(1, true, vec![])],
            removed: vec![1],
            ..Default::default()
        });
        assert!(commands.is_empty());
        assert!(tracker.is_empty());
    }
}
