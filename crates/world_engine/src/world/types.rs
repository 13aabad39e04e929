use std::fmt;

use serde::{Deserialize, Serialize};

use crate::render::HandleId;

pub const SCALE_MIN: f32 = 0.1;
pub const SCALE_MAX: f32 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const ONE: Vec2 = Vec2 { x: 1.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Clamps the magnitude of one scale axis into `[SCALE_MIN, SCALE_MAX]`,
/// keeping its sign so mirrored sprites stay mirrored.
///
/// Non-finite input falls back to identity scale and zero to `SCALE_MIN`.
pub fn clamp_scale_axis(value: f32) -> f32 {
    if !value.is_finite() {
        return 1.0;
    }
    if value == 0.0 {
        return SCALE_MIN;
    }
    value.abs().clamp(SCALE_MIN, SCALE_MAX).copysign(value)
}

/// Grows or shrinks the magnitude of one axis by `delta`. Shrinking stops
/// at `SCALE_MIN` instead of crossing zero.
pub fn step_scale_axis(value: f32, delta: f32) -> f32 {
    clamp_scale_axis((value.abs() + delta).max(SCALE_MIN).copysign(value))
}

pub fn clamp_scale(scale: Vec2) -> Vec2 {
    Vec2 {
        x: clamp_scale_axis(scale.x),
        y: clamp_scale_axis(scale.y),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationConfig {
    pub frame_rate: f32,
    /// `-1` loops forever.
    pub repeat: i32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_rate: 8.0,
            repeat: -1,
        }
    }
}

/// Animation key and config travel together; an instance has both or neither.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationBinding {
    pub key: String,
    pub config: AnimationConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedInstance {
    pub instance_id: InstanceId,
    pub asset_id: AssetId,
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    pub collision_enabled: bool,
    pub z_index: i32,
    pub animation: Option<AnimationBinding>,
    pub(crate) handle: HandleId,
}

impl PlacedInstance {
    pub fn handle(&self) -> HandleId {
        self.handle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldMeta {
    pub world_name: String,
    pub world_size: WorldSize,
    pub created_at_ms: u64,
    pub player_spawn: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_scale_bounds_each_axis() {
        let clamped = clamp_scale(Vec2::new(0.01, 12.0));
        assert_eq!(clamped, Vec2::new(SCALE_MIN, SCALE_MAX));
    }

    #[test]
    fn clamp_scale_keeps_sign_of_mirrored_axis() {
        assert_eq!(clamp_scale_axis(-2.5), -2.5);
        assert_eq!(clamp_scale_axis(-0.01), -SCALE_MIN);
        assert_eq!(clamp_scale_axis(-12.0), -SCALE_MAX);
        assert_eq!(clamp_scale_axis(0.0), SCALE_MIN);
    }

    #[test]
    fn step_scale_moves_magnitude_without_flipping() {
        assert!((step_scale_axis(-2.0, 0.1) + 2.1).abs() < 1e-6);
        assert!((step_scale_axis(1.0, -0.1) - 0.9).abs() < 1e-6);
        assert_eq!(step_scale_axis(0.15, -0.1), SCALE_MIN);
        assert_eq!(step_scale_axis(-0.15, -0.1), -SCALE_MIN);
        assert_eq!(step_scale_axis(4.95, 0.1), SCALE_MAX);
    }

    #[test]
    fn clamp_scale_resets_non_finite_input() {
        assert_eq!(clamp_scale_axis(f32::NAN), 1.0);
        assert_eq!(clamp_scale_axis(f32::INFINITY), 1.0);
    }

    #[test]
    fn distance_is_euclidean() {
        assert!((Vec2::new(0.0, 0.0).distance(Vec2::new(3.0, 4.0)) - 5.0).abs() < f32::EPSILON);
    }
}
