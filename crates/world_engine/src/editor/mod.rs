use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assets::{AnimationRegistry, AssetLibrary, AssetLibraryError};
use crate::config::EditorConfig;
use crate::persistence::{PersistenceError, SaveDebouncer, SaveReceipt, WorldStorage};
use crate::render::{
    CullingEngine, CullingStats, PoolStats, Renderer, SpritePool, TextureKey, TexturePoolStats,
};
use crate::world::{
    step_scale_axis, AssetId, CameraState, InstanceId, PlacedInstance, Vec2, WorldStore,
};

mod events;
mod input;
mod limiter;
mod persist;
mod placement;
mod selection;

pub use events::{EventQueue, WorldEvent};
pub use input::{EditorKey, Modifiers, PointerButton};
pub use limiter::{AssetLimits, LimitCheck};
pub use placement::{PlacementController, PlacementSession, PlacementState};
pub use selection::{
    handle_anchor, snap_angle, snap_to_grid, Corner, DragSession, DragSettings, DragUpdate, Edge,
    HandleKind, HandleWidget, SelectionController,
};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("asset '{0}' is not in the library")]
    AssetNotFound(AssetId),
    #[error("no instance is selected")]
    NoSelection,
    #[error("instance '{0}' is not placed")]
    UnknownInstance(InstanceId),
    #[error(transparent)]
    Library(#[from] AssetLibraryError),
}

#[derive(Debug)]
pub struct FrameReport {
    pub culling: CullingStats,
    /// Present when the trailing-edge save fired this frame.
    pub save: Option<Result<SaveReceipt, PersistenceError>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    Placed(InstanceId),
    PlacementRefused,
    PlacementCancelled,
    DragStarted(HandleKind),
    Selected(InstanceId),
    Deselected,
    Ignored,
}

/// Editing session over one world. Owns every component and drives them from
/// host pointer, keyboard and frame callbacks on a single thread.
pub struct WorldEditor<R, L, S> {
    config: EditorConfig,
    renderer: R,
    library: L,
    storage: S,
    store: WorldStore,
    pool: SpritePool,
    culling: CullingEngine,
    placement: PlacementController,
    selection: SelectionController,
    limits: AssetLimits,
    animations: AnimationRegistry,
    debouncer: SaveDebouncer,
    events: EventQueue,
    now: Instant,
}

impl<R, L, S> WorldEditor<R, L, S>
where
    R: Renderer,
    L: AssetLibrary,
    S: WorldStorage,
{
    pub fn new(config: EditorConfig, renderer: R, library: L, storage: S, now: Instant) -> Self {
        let store = WorldStore::new(config.world_name.clone(), config.world_size);
        let culling = CullingEngine::new(config.culling_enabled, config.culling_margin);
        let limits = AssetLimits::new(config.max_assets, config.asset_warning_threshold);
        let debouncer = SaveDebouncer::new(config.save_debounce);
        Self {
            config,
            renderer,
            library,
            storage,
            store,
            pool: SpritePool::default(),
            culling,
            placement: PlacementController::default(),
            selection: SelectionController::default(),
            limits,
            animations: AnimationRegistry::default(),
            debouncer,
            events: EventQueue::default(),
            now,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    pub fn instance(&self, instance_id: &InstanceId) -> Option<&PlacedInstance> {
        self.store.get(instance_id)
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut L {
        &mut self.library
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn placement(&self) -> &PlacementController {
        &self.placement
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn limits(&self) -> AssetLimits {
        self.limits
    }

    pub fn remaining_capacity(&self) -> usize {
        self.limits.remaining(self.store.len())
    }

    pub fn debouncer(&self) -> &SaveDebouncer {
        &self.debouncer
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn events(&self) -> &[WorldEvent] {
        self.events.peek()
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        self.events.drain()
    }

    pub fn camera(&self) -> CameraState {
        self.renderer.camera()
    }

    pub fn set_camera(&mut self, camera: CameraState) {
        self.renderer.set_camera(camera);
    }

    /// One frame: culls against the current camera, then flushes the pending
    /// save if its window has elapsed.
    pub fn update(&mut self, now: Instant) -> FrameReport {
        self.now = now;
        let culling = self
            .culling
            .update(&mut self.renderer, self.store.instances());
        let save = if self.debouncer.poll(now) {
            Some(self.flush_save())
        } else {
            None
        };
        FrameReport { culling, save }
    }

    pub fn culling_stats(&self) -> CullingStats {
        self.culling.last_stats()
    }

    pub fn culling_enabled(&self) -> bool {
        self.culling.is_enabled()
    }

    pub fn set_culling_enabled(&mut self, enabled: bool) {
        self.culling
            .set_enabled(&mut self.renderer, self.store.instances(), enabled);
        info!(enabled, "culling_toggled");
    }

    pub fn set_culling_margin(&mut self, margin: f32) {
        self.culling.set_margin(margin);
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn texture_pool_stats(&self, texture: &TextureKey) -> TexturePoolStats {
        self.pool.texture_stats(texture)
    }

    pub fn enter_placement(&mut self, asset_id: &AssetId, pointer: Vec2) -> Result<(), EditorError> {
        let record = self
            .library
            .resolve(asset_id)
            .ok_or_else(|| EditorError::AssetNotFound(asset_id.clone()))?;
        let texture = self.library.load_texture(&record)?;
        let animation = self.animations.ensure(&mut self.library, &record)?;

        self.selection.deselect(&mut self.renderer);
        self.placement
            .enter(&mut self.renderer, record, texture, animation, pointer);
        Ok(())
    }

    /// Places the active asset at `point`. Stays in placement mode so the
    /// asset can be stamped again. `None` when idle or at capacity.
    pub fn commit_placement(&mut self, point: Vec2) -> Option<InstanceId> {
        let session = self.placement.session()?;
        let asset_id = session.asset.id.clone();
        let texture = session.texture.clone();
        let animation = session.animation.clone();

        match self.limits.check(self.store.len()) {
            LimitCheck::Reached { current, max } => {
                warn!(current, max, asset_id = %asset_id, "asset_limit_reached");
                self.events
                    .push(WorldEvent::AssetLimitReached { current, max });
                return None;
            }
            LimitCheck::Warning {
                current,
                max,
                threshold,
            } => {
                debug!(current, max, threshold, "asset_limit_warning");
                self.events.push(WorldEvent::AssetLimitWarning {
                    current,
                    max,
                    threshold,
                });
            }
            LimitCheck::Allowed => {}
        }

        let instance_id = self.store.allocate_instance_id();
        let handle = self.pool.acquire(&mut self.renderer, &texture, point);
        if let Some(binding) = &animation {
            self.renderer.play_animation(handle, &binding.key);
        }

        let instance = PlacedInstance {
            instance_id: instance_id.clone(),
            asset_id,
            position: point,
            rotation: 0.0,
            scale: Vec2::ONE,
            collision_enabled: false,
            z_index: 0,
            animation,
            handle,
        };
        if let Err(error) = self.store.insert(instance) {
            warn!(error = %error, "placement_insert_failed");
            self.pool.release(&mut self.renderer, handle, &texture);
            return None;
        }

        debug!(instance_id = %instance_id, x = point.x, y = point.y, "instance_placed");
        self.mark_dirty();
        Some(instance_id)
    }

    pub fn cancel_placement(&mut self) -> bool {
        self.placement.cancel(&mut self.renderer)
    }

    pub fn select(&mut self, instance_id: &InstanceId) -> Result<(), EditorError> {
        let handle = self
            .store
            .get(instance_id)
            .map(PlacedInstance::handle)
            .ok_or_else(|| EditorError::UnknownInstance(instance_id.clone()))?;
        self.selection.select(
            &mut self.renderer,
            instance_id.clone(),
            handle,
            self.config.rotate_handle_offset,
        );
        Ok(())
    }

    pub fn deselect(&mut self) -> Option<InstanceId> {
        self.selection.deselect(&mut self.renderer)
    }

    pub fn selected(&self) -> Option<&PlacedInstance> {
        self.selection
            .selected()
            .and_then(|instance_id| self.store.get(instance_id))
    }

    pub fn start_handle_drag(&mut self, kind: HandleKind, pointer: Vec2) -> Result<(), EditorError> {
        let instance = self.selected().ok_or(EditorError::NoSelection)?;
        let session = DragSession::begin(
            kind,
            pointer,
            instance.position,
            instance.rotation,
            instance.scale,
        );
        self.selection.start_drag(session);
        Ok(())
    }

    /// Applies the active drag for `pointer`. Returns `false` when nothing
    /// changed.
    pub fn update_handle_drag(&mut self, pointer: Vec2, modifiers: Modifiers) -> bool {
        let settings = self.drag_settings();
        let Some(update) = self.selection.update_drag(pointer, modifiers, &settings) else {
            return false;
        };
        let Some(instance_id) = self.selection.selected().cloned() else {
            return false;
        };
        self.apply_drag_update(&instance_id, update);
        self.selection
            .layout_widgets(&mut self.renderer, self.config.rotate_handle_offset);
        true
    }

    pub fn stop_handle_drag(&mut self) -> bool {
        let Some(session) = self.selection.stop_drag() else {
            return false;
        };
        let Some(instance_id) = self.selection.selected().cloned() else {
            return false;
        };
        self.refresh_physics(&instance_id);
        debug!(instance_id = %instance_id, kind = ?session.kind, "handle_drag_finished");
        self.mark_dirty();
        true
    }

    pub fn pointer_down(
        &mut self,
        point: Vec2,
        button: PointerButton,
        _modifiers: Modifiers,
    ) -> PointerOutcome {
        if self.placement.is_placing() {
            return match button {
                PointerButton::Left => match self.commit_placement(point) {
                    Some(instance_id) => PointerOutcome::Placed(instance_id),
                    None => PointerOutcome::PlacementRefused,
                },
                PointerButton::Right => {
                    self.cancel_placement();
                    PointerOutcome::PlacementCancelled
                }
            };
        }

        if button != PointerButton::Left {
            return PointerOutcome::Ignored;
        }

        if let Some(kind) = self
            .selection
            .hit_handle(point, self.config.handle_hit_radius)
        {
            if self.start_handle_drag(kind, point).is_ok() {
                return PointerOutcome::DragStarted(kind);
            }
        }

        match self.pick_instance_at(point) {
            Some(instance_id) => match self.select(&instance_id) {
                Ok(()) => PointerOutcome::Selected(instance_id),
                Err(_) => PointerOutcome::Ignored,
            },
            None => match self.deselect() {
                Some(_) => PointerOutcome::Deselected,
                None => PointerOutcome::Ignored,
            },
        }
    }

    pub fn pointer_moved(&mut self, point: Vec2, modifiers: Modifiers) {
        if self.placement.is_placing() {
            self.placement.pointer_moved(&mut self.renderer, point);
        } else if self.selection.is_dragging() {
            self.update_handle_drag(point, modifiers);
        }
    }

    pub fn pointer_up(&mut self) -> bool {
        self.stop_handle_drag()
    }

    /// Topmost visible instance under `point`: highest z-index, then the most
    /// recently placed.
    pub fn pick_instance_at(&self, point: Vec2) -> Option<InstanceId> {
        self.store
            .instances()
            .iter()
            .enumerate()
            .filter(|(_, instance)| self.renderer.is_visible(instance.handle))
            .filter(|(_, instance)| {
                self.renderer
                    .geometry(instance.handle)
                    .is_some_and(|geometry| geometry.aabb().contains_point(point))
            })
            .max_by_key(|(index, instance)| (instance.z_index, *index))
            .map(|(_, instance)| instance.instance_id.clone())
    }

    pub fn key_pressed(&mut self, key: EditorKey) -> bool {
        let rotate_step = self.config.key_rotate_step_degrees.to_radians();
        let scale_step = self.config.key_scale_step;
        match key {
            EditorKey::Escape => {
                if self.placement.is_placing() {
                    self.cancel_placement()
                } else {
                    self.deselect().is_some()
                }
            }
            EditorKey::RotateLeft => self.rotate_selected(-rotate_step).is_some(),
            EditorKey::RotateRight => self.rotate_selected(rotate_step).is_some(),
            EditorKey::ScaleUp => self.scale_selected(scale_step).is_some(),
            EditorKey::ScaleDown => self.scale_selected(-scale_step).is_some(),
            EditorKey::Delete => self.remove_selected().is_some(),
            EditorKey::ToggleCollision => self.toggle_collision().is_some(),
            EditorKey::RaiseLayer => self.shift_layer(1).is_some(),
            EditorKey::LowerLayer => self.shift_layer(-1).is_some(),
        }
    }

    /// Adds `delta` radians to the selected instance's rotation.
    pub fn rotate_selected(&mut self, delta: f32) -> Option<f32> {
        let instance = self.selected()?;
        let instance_id = instance.instance_id.clone();
        let rotation = instance.rotation + delta;
        self.apply_drag_update(&instance_id, DragUpdate::Rotation(rotation));
        self.selection
            .layout_widgets(&mut self.renderer, self.config.rotate_handle_offset);
        self.refresh_physics(&instance_id);
        self.mark_dirty();
        Some(rotation)
    }

    /// Adds `delta` to the magnitude of both scale axes; the stored result
    /// is clamped and mirrored axes stay mirrored.
    pub fn scale_selected(&mut self, delta: f32) -> Option<Vec2> {
        let instance = self.selected()?;
        let instance_id = instance.instance_id.clone();
        let requested = Vec2::new(
            step_scale_axis(instance.scale.x, delta),
            step_scale_axis(instance.scale.y, delta),
        );
        self.apply_drag_update(&instance_id, DragUpdate::Scale(requested));
        self.selection
            .layout_widgets(&mut self.renderer, self.config.rotate_handle_offset);
        self.refresh_physics(&instance_id);
        self.mark_dirty();
        self.store.get(&instance_id).map(|instance| instance.scale)
    }

    /// Flips collision on the selected instance. The body stays off while the
    /// instance is culled.
    pub fn toggle_collision(&mut self) -> Option<bool> {
        let instance = self.selected()?;
        let instance_id = instance.instance_id.clone();
        let handle = instance.handle;
        let enabled = !instance.collision_enabled;

        self.store.set_collision(&instance_id, enabled);
        let active = enabled && self.renderer.is_visible(handle);
        self.renderer.set_physics_enabled(handle, active);
        if active {
            self.renderer.refresh_physics_body(handle);
        }
        debug!(instance_id = %instance_id, enabled, "collision_toggled");
        self.mark_dirty();
        Some(enabled)
    }

    pub fn shift_layer(&mut self, delta: i32) -> Option<i32> {
        let instance = self.selected()?;
        let instance_id = instance.instance_id.clone();
        let handle = instance.handle;
        let z_index = instance.z_index.saturating_add(delta);

        self.store.set_z_index(&instance_id, z_index);
        self.renderer.set_depth(handle, z_index);
        self.mark_dirty();
        Some(z_index)
    }

    pub fn remove_selected(&mut self) -> Option<PlacedInstance> {
        let instance_id = self.selection.selected().cloned()?;
        self.remove_instance(&instance_id)
    }

    /// Removes one instance and returns its drawable to the pool.
    pub fn remove_instance(&mut self, instance_id: &InstanceId) -> Option<PlacedInstance> {
        if self.selection.selected() == Some(instance_id) {
            self.selection.deselect(&mut self.renderer);
        }
        let removed = self.store.remove(instance_id)?;
        self.release_instance_handle(&removed);
        debug!(instance_id = %instance_id, "instance_removed");
        self.mark_dirty();
        Some(removed)
    }

    /// Removes every instance and resets placement and selection. Returns the
    /// number of instances removed.
    pub fn clear_world(&mut self) -> usize {
        self.placement.cancel(&mut self.renderer);
        let removed = self.clear_instances();
        info!(removed, "world_cleared");
        self.mark_dirty();
        removed
    }

    fn clear_instances(&mut self) -> usize {
        self.selection.deselect(&mut self.renderer);
        let removed = self.store.clear();
        for instance in &removed {
            self.release_instance_handle(instance);
        }
        removed.len()
    }

    fn release_instance_handle(&mut self, instance: &PlacedInstance) {
        match self.pool.texture_of(instance.handle).cloned() {
            Some(texture) => {
                self.pool
                    .release(&mut self.renderer, instance.handle, &texture);
            }
            None => warn!(
                instance_id = %instance.instance_id,
                handle = instance.handle.0,
                "instance_handle_not_pooled"
            ),
        }
    }

    fn apply_drag_update(&mut self, instance_id: &InstanceId, update: DragUpdate) {
        let Some(handle) = self.store.get(instance_id).map(PlacedInstance::handle) else {
            return;
        };
        match update {
            DragUpdate::Position(position) => {
                if self.store.set_position(instance_id, position) {
                    self.renderer.set_position(handle, position);
                }
            }
            DragUpdate::Rotation(rotation) => {
                if self.store.set_rotation(instance_id, rotation) {
                    self.renderer.set_rotation(handle, rotation);
                }
            }
            DragUpdate::Scale(scale) => {
                if let Some(clamped) = self.store.set_scale(instance_id, scale) {
                    self.renderer.set_scale(handle, clamped);
                }
            }
        }
    }

    fn refresh_physics(&mut self, instance_id: &InstanceId) {
        if let Some(instance) = self.store.get(instance_id) {
            if instance.collision_enabled {
                self.renderer.refresh_physics_body(instance.handle);
            }
        }
    }

    fn drag_settings(&self) -> DragSettings {
        DragSettings {
            move_snap_grid: self.config.move_snap_grid,
            rotate_snap_degrees: self.config.rotate_snap_degrees,
        }
    }

    fn mark_dirty(&mut self) {
        self.debouncer.mark_dirty(self.now);
    }
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
