use std::collections::HashMap;

use tracing::{debug, warn};

use super::{HandleId, Renderer, TextureKey};
use crate::world::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of textures with a free list.
    pub pools: usize,
    pub pooled_count: usize,
    pub active_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TexturePoolStats {
    pub active: usize,
    pub pooled: usize,
    pub created: usize,
}

/// Reuses drawables per texture. Released handles are hidden and parked on a
/// free list instead of being destroyed.
#[derive(Debug, Default)]
pub struct SpritePool {
    free: HashMap<TextureKey, Vec<HandleId>>,
    active: HashMap<HandleId, TextureKey>,
    created: HashMap<TextureKey, usize>,
}

impl SpritePool {
    pub fn acquire<R: Renderer>(
        &mut self,
        renderer: &mut R,
        texture: &TextureKey,
        position: Vec2,
    ) -> HandleId {
        let reused = self.free.get_mut(texture).and_then(Vec::pop);
        let handle = match reused {
            Some(handle) => handle,
            None => {
                let handle = renderer.create_sprite(texture, position);
                *self.created.entry(texture.clone()).or_insert(0) += 1;
                debug!(texture = %texture, handle = handle.0, "pool_allocated_handle");
                handle
            }
        };

        renderer.set_position(handle, position);
        renderer.set_rotation(handle, 0.0);
        renderer.set_scale(handle, Vec2::ONE);
        renderer.set_alpha(handle, 1.0);
        renderer.set_tint(handle, None);
        renderer.set_depth(handle, 0);
        renderer.set_visible(handle, true);
        renderer.set_physics_enabled(handle, false);
        renderer.set_interactive(handle, true);

        self.active.insert(handle, texture.clone());
        handle
    }

    /// Parks `handle` on the free list for `texture`. Returns `false` when the
    /// handle is not currently active in this pool.
    pub fn release<R: Renderer>(
        &mut self,
        renderer: &mut R,
        handle: HandleId,
        texture: &TextureKey,
    ) -> bool {
        let Some(owner_texture) = self.active.remove(&handle) else {
            warn!(handle = handle.0, texture = %texture, "pool_release_unknown_handle");
            return false;
        };
        if &owner_texture != texture {
            warn!(
                handle = handle.0,
                requested = %texture,
                owner = %owner_texture,
                "pool_release_texture_mismatch"
            );
        }

        renderer.set_visible(handle, false);
        renderer.set_physics_enabled(handle, false);
        renderer.stop_animation(handle);
        renderer.set_interactive(handle, false);
        renderer.set_tint(handle, None);

        self.free.entry(owner_texture).or_default().push(handle);
        true
    }

    pub fn is_active(&self, handle: HandleId) -> bool {
        self.active.contains_key(&handle)
    }

    /// Texture an active handle was acquired for.
    pub fn texture_of(&self, handle: HandleId) -> Option<&TextureKey> {
        self.active.get(&handle)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pools: self.free.len(),
            pooled_count: self.free.values().map(Vec::len).sum(),
            active_count: self.active.len(),
        }
    }

    pub fn texture_stats(&self, texture: &TextureKey) -> TexturePoolStats {
        TexturePoolStats {
            active: self
                .active
                .values()
                .filter(|owner| *owner == texture)
                .count(),
            pooled: self.free.get(texture).map_or(0, Vec::len),
            created: self.created.get(texture).copied().unwrap_or(0),
        }
    }

    /// Destroys every drawable the pool knows about, active or free.
    pub fn destroy_all<R: Renderer>(&mut self, renderer: &mut R) {
        for (handle, _) in self.active.drain() {
            renderer.destroy_sprite(handle);
        }
        for (_, handles) in self.free.drain() {
            for handle in handles {
                renderer.destroy_sprite(handle);
            }
        }
        self.created.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessRenderer;

    fn key(name: &str) -> TextureKey {
        TextureKey(name.to_string())
    }

    #[test]
    fn release_then_acquire_reuses_handle() {
        let mut renderer = HeadlessRenderer::default();
        let mut pool = SpritePool::default();
        let tree = key("tree");

        let first = pool.acquire(&mut renderer, &tree, Vec2::new(1.0, 1.0));
        assert!(pool.release(&mut renderer, first, &tree));
        let second = pool.acquire(&mut renderer, &tree, Vec2::new(9.0, 9.0));

        assert_eq!(first, second);
        assert_eq!(renderer.created_count(), 1);
        let sprite = renderer.sprite(second).expect("sprite");
        assert!(sprite.visible);
        assert_eq!(sprite.position, Vec2::new(9.0, 9.0));
    }

    #[test]
    fn release_hides_and_disables_physics_without_destroying() {
        let mut renderer = HeadlessRenderer::default();
        let mut pool = SpritePool::default();
        let tree = key("tree");

        let handle = pool.acquire(&mut renderer, &tree, Vec2::ZERO);
        renderer.set_physics_enabled(handle, true);
        renderer.play_animation(handle, "anim_tree");
        pool.release(&mut renderer, handle, &tree);

        let sprite = renderer.sprite(handle).expect("still alive");
        assert!(!sprite.visible);
        assert!(!sprite.physics_enabled);
        assert!(!sprite.interactive);
        assert_eq!(sprite.animation, None);
        assert_eq!(renderer.destroyed_count(), 0);
    }

    #[test]
    fn acquire_resets_transform_and_tint_of_reused_handle() {
        let mut renderer = HeadlessRenderer::default();
        let mut pool = SpritePool::default();
        let tree = key("tree");

        let handle = pool.acquire(&mut renderer, &tree, Vec2::ZERO);
        renderer.set_scale(handle, Vec2::new(3.0, 3.0));
        renderer.set_rotation(handle, 1.2);
        renderer.set_tint(handle, Some(0xff0000));
        pool.release(&mut renderer, handle, &tree);

        let reused = pool.acquire(&mut renderer, &tree, Vec2::ZERO);
        let sprite = renderer.sprite(reused).expect("sprite");
        assert_eq!(sprite.scale, Vec2::ONE);
        assert_eq!(sprite.rotation, 0.0);
        assert_eq!(sprite.tint, None);
        assert!(sprite.interactive);
    }

    #[test]
    fn double_release_is_rejected() {
        let mut renderer = HeadlessRenderer::default();
        let mut pool = SpritePool::default();
        let tree = key("tree");

        let handle = pool.acquire(&mut renderer, &tree, Vec2::ZERO);
        assert!(pool.release(&mut renderer, handle, &tree));
        assert!(!pool.release(&mut renderer, handle, &tree));
        assert_eq!(pool.texture_stats(&tree).pooled, 1);
    }

    #[test]
    fn active_plus_pooled_matches_created_for_any_sequence() {
        let mut renderer = HeadlessRenderer::default();
        let mut pool = SpritePool::default();
        let tree = key("tree");
        let mut held = Vec::new();

        // acquire 3, release 2, acquire 4, release all but one
        for _ in 0..3 {
            held.push(pool.acquire(&mut renderer, &tree, Vec2::ZERO));
        }
        for handle in held.drain(..2) {
            pool.release(&mut renderer, handle, &tree);
        }
        for _ in 0..4 {
            held.push(pool.acquire(&mut renderer, &tree, Vec2::ZERO));
        }
        while held.len() > 1 {
            let handle = held.pop().expect("handle");
            pool.release(&mut renderer, handle, &tree);
        }

        let stats = pool.texture_stats(&tree);
        assert_eq!(stats.active + stats.pooled, stats.created);
        assert_eq!(stats.created, 5);
        assert_eq!(stats.created, renderer.created_count());
    }

    #[test]
    fn stats_count_pools_per_texture() {
        let mut renderer = HeadlessRenderer::default();
        let mut pool = SpritePool::default();
        let tree = key("tree");
        let rock = key("rock");

        let a = pool.acquire(&mut renderer, &tree, Vec2::ZERO);
        let b = pool.acquire(&mut renderer, &rock, Vec2::ZERO);
        pool.acquire(&mut renderer, &rock, Vec2::ZERO);
        pool.release(&mut renderer, a, &tree);
        pool.release(&mut renderer, b, &rock);

        assert_eq!(
            pool.stats(),
            PoolStats {
                pools: 2,
                pooled_count: 2,
                active_count: 1,
            }
        );
    }

    #[test]
    fn destroy_all_empties_pool_and_renderer() {
        let mut renderer = HeadlessRenderer::default();
        let mut pool = SpritePool::default();
        let tree = key("tree");

        let handle = pool.acquire(&mut renderer, &tree, Vec2::ZERO);
        pool.acquire(&mut renderer, &tree, Vec2::ZERO);
        pool.release(&mut renderer, handle, &tree);
        pool.destroy_all(&mut renderer);

        assert_eq!(pool.stats(), PoolStats::default());
        assert_eq!(pool.texture_stats(&tree), TexturePoolStats::default());
        assert_eq!(renderer.live_sprite_count(), 0);
    }
}
