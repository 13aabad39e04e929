use tracing::debug;

use crate::assets::AssetRecord;
use crate::render::{HandleId, Renderer, TextureKey};
use crate::world::{AnimationBinding, Vec2};

pub(crate) const PREVIEW_ALPHA: f32 = 0.6;
pub(crate) const PREVIEW_TINT: u32 = 0x88ff88;
pub(crate) const PREVIEW_DEPTH: i32 = 10_000;

/// Asset currently attached to the cursor.
#[derive(Debug, Clone)]
pub struct PlacementSession {
    pub asset: AssetRecord,
    pub texture: TextureKey,
    pub animation: Option<AnimationBinding>,
    pub preview: HandleId,
}

#[derive(Debug, Clone, Default)]
pub enum PlacementState {
    #[default]
    Idle,
    Placing(PlacementSession),
}

/// Preview-then-commit placement. Committing does not leave `Placing`, so
/// the same asset can be stamped repeatedly.
#[derive(Debug, Default)]
pub struct PlacementController {
    state: PlacementState,
}

impl PlacementController {
    pub fn state(&self) -> &PlacementState {
        &self.state
    }

    pub fn is_placing(&self) -> bool {
        matches!(self.state, PlacementState::Placing(_))
    }

    pub fn session(&self) -> Option<&PlacementSession> {
        match &self.state {
            PlacementState::Placing(session) => Some(session),
            PlacementState::Idle => None,
        }
    }

    /// Drops any previous preview and starts placing `asset`.
    pub fn enter<R: Renderer>(
        &mut self,
        renderer: &mut R,
        asset: AssetRecord,
        texture: TextureKey,
        animation: Option<AnimationBinding>,
        pointer: Vec2,
    ) {
        self.cancel(renderer);

        let preview = renderer.create_sprite(&texture, pointer);
        renderer.set_alpha(preview, PREVIEW_ALPHA);
        renderer.set_tint(preview, Some(PREVIEW_TINT));
        renderer.set_depth(preview, PREVIEW_DEPTH);
        renderer.set_interactive(preview, false);
        renderer.set_physics_enabled(preview, false);
        if let Some(binding) = &animation {
            renderer.play_animation(preview, &binding.key);
        }

        debug!(asset_id = %asset.id, preview = preview.0, "placement_entered");
        self.state = PlacementState::Placing(PlacementSession {
            asset,
            texture,
            animation,
            preview,
        });
    }

    /// Keeps the preview under the pointer. Ignored while idle.
    pub fn pointer_moved<R: Renderer>(&mut self, renderer: &mut R, world_point: Vec2) {
        if let PlacementState::Placing(session) = &self.state {
            renderer.set_position(session.preview, world_point);
        }
    }

    /// Returns `true` when a placement was actually cancelled.
    pub fn cancel<R: Renderer>(&mut self, renderer: &mut R) -> bool {
        match std::mem::take(&mut self.state) {
            PlacementState::Placing(session) => {
                renderer.destroy_sprite(session.preview);
                debug!(asset_id = %session.asset.id, "placement_cancelled");
                true
            }
            PlacementState::Idle => false,
        }
    }
}
