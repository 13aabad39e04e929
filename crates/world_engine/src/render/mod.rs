mod culling;
mod headless;
mod pool;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::world::{CameraState, Vec2};

pub use culling::{CullingEngine, CullingStats, DEFAULT_CULLING_MARGIN};
pub use headless::{HeadlessRenderer, HeadlessSprite};
pub use pool::{PoolStats, SpritePool, TexturePoolStats};

/// Index of a drawable owned by the renderer. Components hold ids, never the
/// drawable itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureKey(pub String);

impl TextureKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Axis-aligned rectangle in world units, y growing downward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn expanded(&self, margin: f32) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }

    /// Touching edges count as intersecting.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.top() <= other.bottom()
            && other.top() <= self.bottom()
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }
}

/// Position, unscaled frame size and scale of a drawable. Sprites are
/// centered on their position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteGeometry {
    pub position: Vec2,
    pub frame_size: Vec2,
    pub scale: Vec2,
}

impl SpriteGeometry {
    pub fn scaled_size(&self) -> Vec2 {
        Vec2::new(
            self.frame_size.x * self.scale.x.abs(),
            self.frame_size.y * self.scale.y.abs(),
        )
    }

    pub fn aabb(&self) -> Rect {
        let size = self.scaled_size();
        Rect {
            x: self.position.x - size.x * 0.5,
            y: self.position.y - size.y * 0.5,
            width: size.x,
            height: size.y,
        }
    }
}

/// Drawing capability the editor depends on. Everything is addressed by
/// [`HandleId`]; calls against unknown handles are ignored by implementations.
pub trait Renderer {
    fn create_sprite(&mut self, texture: &TextureKey, position: Vec2) -> HandleId;
    fn destroy_sprite(&mut self, handle: HandleId);

    fn set_position(&mut self, handle: HandleId, position: Vec2);
    fn set_rotation(&mut self, handle: HandleId, radians: f32);
    fn set_scale(&mut self, handle: HandleId, scale: Vec2);
    fn set_visible(&mut self, handle: HandleId, visible: bool);
    fn is_visible(&self, handle: HandleId) -> bool;
    fn set_alpha(&mut self, handle: HandleId, alpha: f32);
    fn set_tint(&mut self, handle: HandleId, tint: Option<u32>);
    fn set_depth(&mut self, handle: HandleId, depth: i32);
    fn set_interactive(&mut self, handle: HandleId, interactive: bool);

    fn set_physics_enabled(&mut self, handle: HandleId, enabled: bool);
    /// Re-syncs the static body with the drawable's current transform.
    fn refresh_physics_body(&mut self, handle: HandleId);

    fn play_animation(&mut self, handle: HandleId, key: &str);
    fn stop_animation(&mut self, handle: HandleId);

    fn geometry(&self, handle: HandleId) -> Option<SpriteGeometry>;

    /// Visible world-space rectangle of the main camera.
    fn camera_view(&self) -> Rect;
    fn camera(&self) -> CameraState;
    fn set_camera(&mut self, camera: CameraState);
}
