//! Virtual screen placement in world space.

use glam::Vec3;
use serde::Serialize;

use crate::types::Pose;

/// Distance (meters) in front of the viewer the screen is placed at.
pub const COMFORT_DISTANCE_M: f32 = 2.5;

const ASPECT_WIDTH: f32 = 16.0;
const ASPECT_HEIGHT: f32 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VirtualScreenConfig {
    pub position: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    pub scale: f32,
    pub width: f32,
    pub height: f32,
}

impl VirtualScreenConfig {
    /// A 16:9 screen; unset position/rotation fall back to 2 m ahead at standing eye height.
    pub fn new(position: Option<Vec3>, rotation: Option<Vec3>, scale: f32) -> Self {
        Self {
            position: position.unwrap_or(Vec3::new(0.0, 1.5, -2.0)),
            rotation: rotation.unwrap_or(Vec3::ZERO),
            scale,
            width: ASPECT_WIDTH * scale,
            height: ASPECT_HEIGHT * scale,
        }
    }
}

impl Default for VirtualScreenConfig {
    fn default() -> Self {
        Self::new(None, None, 1.0)
    }
}

/// Place the screen straight ahead of the head at eye height.
///
/// Head orientation is not applied yet: the screen always sits along -Z.
pub fn place_screen(head: &Pose) -> VirtualScreenConfig {
    let position = Vec3::new(
        head.position.x,
        head.position.y,
        head.position.z - COMFORT_DISTANCE_M,
    );
    VirtualScreenConfig::new(Some(position), None, 1.0)
}
