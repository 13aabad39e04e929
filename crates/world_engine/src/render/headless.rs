use std::collections::HashMap;

use tracing::debug;

use super::{HandleId, Rect, Renderer, SpriteGeometry, TextureKey};
use crate::world::{CameraState, Vec2};

const DEFAULT_FRAME_SIZE: Vec2 = Vec2 { x: 64.0, y: 64.0 };
const DEFAULT_VIEWPORT: Vec2 = Vec2 { x: 1280.0, y: 720.0 };

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSprite {
    pub texture: TextureKey,
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    pub frame_size: Vec2,
    pub visible: bool,
    pub alpha: f32,
    pub tint: Option<u32>,
    pub depth: i32,
    pub interactive: bool,
    pub physics_enabled: bool,
    pub physics_refreshes: u32,
    pub animation: Option<String>,
}

/// In-memory renderer: keeps sprite state in an arena so hosts without a GPU
/// and tests can drive the editor and inspect the result.
#[derive(Debug)]
pub struct HeadlessRenderer {
    sprites: HashMap<HandleId, HeadlessSprite>,
    next_handle: u64,
    frame_sizes: HashMap<TextureKey, Vec2>,
    viewport_size: Vec2,
    camera: CameraState,
    created_count: usize,
    destroyed_count: usize,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT)
    }
}

impl HeadlessRenderer {
    pub fn new(viewport_size: Vec2) -> Self {
        Self {
            sprites: HashMap::new(),
            next_handle: 0,
            frame_sizes: HashMap::new(),
            viewport_size,
            camera: CameraState::default(),
            created_count: 0,
            destroyed_count: 0,
        }
    }

    pub fn set_frame_size(&mut self, texture: TextureKey, size: Vec2) {
        self.frame_sizes.insert(texture, size);
    }

    pub fn set_viewport_size(&mut self, size: Vec2) {
        self.viewport_size = size;
    }

    pub fn sprite(&self, handle: HandleId) -> Option<&HeadlessSprite> {
        self.sprites.get(&handle)
    }

    pub fn live_sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn created_count(&self) -> usize {
        self.created_count
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed_count
    }

    fn with_sprite(&mut self, handle: HandleId, apply: impl FnOnce(&mut HeadlessSprite)) {
        match self.sprites.get_mut(&handle) {
            Some(sprite) => apply(sprite),
            None => debug!(handle = handle.0, "headless_unknown_handle"),
        }
    }
}

impl Renderer for HeadlessRenderer {
    fn create_sprite(&mut self, texture: &TextureKey, position: Vec2) -> HandleId {
        let handle = HandleId(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        let frame_size = self
            .frame_sizes
            .get(texture)
            .copied()
            .unwrap_or(DEFAULT_FRAME_SIZE);
        self.sprites.insert(
            handle,
            HeadlessSprite {
                texture: texture.clone(),
                position,
                rotation: 0.0,
                scale: Vec2::ONE,
                frame_size,
                visible: true,
                alpha: 1.0,
                tint: None,
                depth: 0,
                interactive: false,
                physics_enabled: false,
                physics_refreshes: 0,
                animation: None,
            },
        );
        self.created_count += 1;
        handle
    }

    fn destroy_sprite(&mut self, handle: HandleId) {
        if self.sprites.remove(&handle).is_some() {
            self.destroyed_count += 1;
        }
    }

    fn set_position(&mut self, handle: HandleId, position: Vec2) {
        self.with_sprite(handle, |sprite| sprite.position = position);
    }

    fn set_rotation(&mut self, handle: HandleId, radians: f32) {
        self.with_sprite(handle, |sprite| sprite.rotation = radians);
    }

    fn set_scale(&mut self, handle: HandleId, scale: Vec2) {
        self.with_sprite(handle, |sprite| sprite.scale = scale);
    }

    fn set_visible(&mut self, handle: HandleId, visible: bool) {
        self.with_sprite(handle, |sprite| sprite.visible = visible);
    }

    fn is_visible(&self, handle: HandleId) -> bool {
        self.sprites.get(&handle).is_some_and(|sprite| sprite.visible)
    }

    fn set_alpha(&mut self, handle: HandleId, alpha: f32) {
        self.with_sprite(handle, |sprite| sprite.alpha = alpha);
    }

    fn set_tint(&mut self, handle: HandleId, tint: Option<u32>) {
        self.with_sprite(handle, |sprite| sprite.tint = tint);
    }

    fn set_depth(&mut self, handle: HandleId, depth: i32) {
        self.with_sprite(handle, |sprite| sprite.depth = depth);
    }

    fn set_interactive(&mut self, handle: HandleId, interactive: bool) {
        self.with_sprite(handle, |sprite| sprite.interactive = interactive);
    }

    fn set_physics_enabled(&mut self, handle: HandleId, enabled: bool) {
        self.with_sprite(handle, |sprite| sprite.physics_enabled = enabled);
    }

    fn refresh_physics_body(&mut self, handle: HandleId) {
        self.with_sprite(handle, |sprite| {
            sprite.physics_refreshes = sprite.physics_refreshes.saturating_add(1)
        });
    }

    fn play_animation(&mut self, handle: HandleId, key: &str) {
        self.with_sprite(handle, |sprite| sprite.animation = Some(key.to_string()));
    }

    fn stop_animation(&mut self, handle: HandleId) {
        self.with_sprite(handle, |sprite| sprite.animation = None);
    }

    fn geometry(&self, handle: HandleId) -> Option<SpriteGeometry> {
        self.sprites.get(&handle).map(|sprite| SpriteGeometry {
            position: sprite.position,
            frame_size: sprite.frame_size,
            scale: sprite.scale,
        })
    }

    fn camera_view(&self) -> Rect {
        let zoom = if self.camera.zoom.is_finite() && self.camera.zoom > 0.0 {
            self.camera.zoom
        } else {
            1.0
        };
        Rect::new(
            self.camera.x,
            self.camera.y,
            self.viewport_size.x / zoom,
            self.viewport_size.y / zoom,
        )
    }

    fn camera(&self) -> CameraState {
        self.camera
    }

    fn set_camera(&mut self, camera: CameraState) {
        self.camera = camera;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_uses_registered_frame_size() {
        let mut renderer = HeadlessRenderer::default();
        let texture = TextureKey("asset_rock".to_string());
        renderer.set_frame_size(texture.clone(), Vec2::new(32.0, 16.0));
        let handle = renderer.create_sprite(&texture, Vec2::new(5.0, 5.0));
        let geometry = renderer.geometry(handle).expect("geometry");
        assert_eq!(geometry.frame_size, Vec2::new(32.0, 16.0));
        assert_eq!(geometry.position, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn camera_view_divides_viewport_by_zoom() {
        let mut renderer = HeadlessRenderer::new(Vec2::new(800.0, 600.0));
        renderer.set_camera(CameraState {
            x: 10.0,
            y: 20.0,
            zoom: 2.0,
        });
        assert_eq!(renderer.camera_view(), Rect::new(10.0, 20.0, 400.0, 300.0));
    }

    #[test]
    fn destroy_counts_only_live_sprites() {
        let mut renderer = HeadlessRenderer::default();
        let handle = renderer.create_sprite(&TextureKey("t".to_string()), Vec2::ZERO);
        renderer.destroy_sprite(handle);
        renderer.destroy_sprite(handle);
        assert_eq!(renderer.destroyed_count(), 1);
        assert_eq!(renderer.live_sprite_count(), 0);
    }
}
