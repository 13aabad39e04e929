use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use super::types::{clamp_scale, InstanceId, PlacedInstance, Vec2, WorldMeta, WorldSize};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("instance id '{0}' is already placed")]
    DuplicateInstance(InstanceId),
}

pub(crate) fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Hands out `inst_<session>_<seq>` ids. The session stamp is taken once so
/// ids stay short and ordered within a run.
#[derive(Debug)]
pub struct InstanceIdAllocator {
    session: u64,
    next: u64,
}

impl Default for InstanceIdAllocator {
    fn default() -> Self {
        Self {
            session: epoch_millis(),
            next: 0,
        }
    }
}

impl InstanceIdAllocator {
    pub fn allocate(&mut self) -> InstanceId {
        let id = InstanceId(format!("inst_{}_{}", self.session, self.next));
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Authoritative collection of placed instances plus world metadata.
///
/// Instances are only mutated through the methods here so that instance ids
/// stay unique and scale stays clamped.
#[derive(Debug)]
pub struct WorldStore {
    meta: WorldMeta,
    instances: Vec<PlacedInstance>,
    allocator: InstanceIdAllocator,
}

impl WorldStore {
    pub fn new(world_name: impl Into<String>, world_size: WorldSize) -> Self {
        Self {
            meta: WorldMeta {
                world_name: world_name.into(),
                world_size,
                created_at_ms: epoch_millis(),
                player_spawn: Vec2::ZERO,
            },
            instances: Vec::new(),
            allocator: InstanceIdAllocator::default(),
        }
    }

    pub fn meta(&self) -> &WorldMeta {
        &self.meta
    }

    pub fn set_world_name(&mut self, name: impl Into<String>) {
        self.meta.world_name = name.into();
    }

    pub fn set_world_size(&mut self, size: WorldSize) {
        self.meta.world_size = size;
    }

    pub fn set_created_at_ms(&mut self, created_at_ms: u64) {
        self.meta.created_at_ms = created_at_ms;
    }

    pub fn set_player_spawn(&mut self, spawn: Vec2) {
        self.meta.player_spawn = spawn;
    }

    /// Returns an id not currently used by any placed instance.
    pub fn allocate_instance_id(&mut self) -> InstanceId {
        loop {
            let id = self.allocator.allocate();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    pub fn insert(&mut self, mut instance: PlacedInstance) -> Result<(), StoreError> {
        if self.contains(&instance.instance_id) {
            return Err(StoreError::DuplicateInstance(instance.instance_id));
        }
        instance.scale = clamp_scale(instance.scale);
        self.instances.push(instance);
        Ok(())
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.instances.iter().any(|instance| &instance.instance_id == id)
    }

    pub fn get(&self, id: &InstanceId) -> Option<&PlacedInstance> {
        self.instances.iter().find(|instance| &instance.instance_id == id)
    }

    fn get_mut(&mut self, id: &InstanceId) -> Option<&mut PlacedInstance> {
        self.instances
            .iter_mut()
            .find(|instance| &instance.instance_id == id)
    }

    pub fn set_position(&mut self, id: &InstanceId, position: Vec2) -> bool {
        match self.get_mut(id) {
            Some(instance) => {
                instance.position = position;
                true
            }
            None => false,
        }
    }

    pub fn set_rotation(&mut self, id: &InstanceId, rotation: f32) -> bool {
        match self.get_mut(id) {
            Some(instance) => {
                instance.rotation = rotation;
                true
            }
            None => false,
        }
    }

    /// Stores the clamped scale and returns what was actually applied.
    pub fn set_scale(&mut self, id: &InstanceId, scale: Vec2) -> Option<Vec2> {
        let instance = self.get_mut(id)?;
        instance.scale = clamp_scale(scale);
        Some(instance.scale)
    }

    pub fn set_collision(&mut self, id: &InstanceId, enabled: bool) -> bool {
        match self.get_mut(id) {
            Some(instance) => {
                instance.collision_enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn set_z_index(&mut self, id: &InstanceId, z_index: i32) -> bool {
        match self.get_mut(id) {
            Some(instance) => {
                instance.z_index = z_index;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &InstanceId) -> Option<PlacedInstance> {
        let index = self
            .instances
            .iter()
            .position(|instance| &instance.instance_id == id)?;
        Some(self.instances.remove(index))
    }

    /// Removes every instance; world metadata is kept.
    pub fn clear(&mut self) -> Vec<PlacedInstance> {
        std::mem::take(&mut self.instances)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[PlacedInstance] {
        &self.instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HandleId;
    use crate::world::AssetId;

    fn instance(id: &str) -> PlacedInstance {
        PlacedInstance {
            instance_id: InstanceId(id.to_string()),
            asset_id: AssetId("tree".to_string()),
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            collision_enabled: false,
            z_index: 0,
            animation: None,
            handle: HandleId(0),
        }
    }

    fn store() -> WorldStore {
        WorldStore::new(
            "test",
            WorldSize {
                width: 100.0,
                height: 100.0,
            },
        )
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = InstanceIdAllocator::default();
        let first = allocator.allocate();
        let second = allocator.allocate();
        assert_ne!(first, second);
    }

    #[test]
    fn insert_rejects_duplicate_instance_id() {
        let mut store = store();
        store.insert(instance("a")).expect("first insert");
        let err = store.insert(instance("a")).expect_err("duplicate");
        assert_eq!(err, StoreError::DuplicateInstance(InstanceId("a".to_string())));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn allocated_id_skips_ids_already_in_store() {
        let mut store = store();
        let taken = InstanceIdAllocator {
            session: store.allocator.session,
            next: 0,
        }
        .allocate();
        store.insert(instance(taken.as_str())).expect("insert");

        let allocated = store.allocate_instance_id();
        assert_ne!(allocated, taken);
        assert!(!store.contains(&allocated));
    }

    #[test]
    fn set_scale_clamps_and_reports_applied_value() {
        let mut store = store();
        store.insert(instance("a")).expect("insert");
        let id = InstanceId("a".to_string());
        let applied = store.set_scale(&id, Vec2::new(9.0, 0.0)).expect("exists");
        assert_eq!(applied, Vec2::new(5.0, 0.1));
        assert_eq!(store.get(&id).expect("exists").scale, applied);
    }

    #[test]
    fn insert_clamps_out_of_range_scale() {
        let mut store = store();
        let mut oversized = instance("a");
        oversized.scale = Vec2::new(40.0, 1.0);
        store.insert(oversized).expect("insert");
        assert_eq!(store.instances()[0].scale, Vec2::new(5.0, 1.0));
    }

    #[test]
    fn remove_and_clear_return_records() {
        let mut store = store();
        store.insert(instance("a")).expect("a");
        store.insert(instance("b")).expect("b");
        store.insert(instance("c")).expect("c");

        let removed = store.remove(&InstanceId("b".to_string())).expect("b");
        assert_eq!(removed.instance_id.as_str(), "b");
        assert!(store.remove(&InstanceId("b".to_string())).is_none());

        let cleared = store.clear();
        assert_eq!(cleared.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn mutators_report_missing_instances() {
        let mut store = store();
        let missing = InstanceId("missing".to_string());
        assert!(!store.set_position(&missing, Vec2::ONE));
        assert!(!store.set_rotation(&missing, 1.0));
        assert!(store.set_scale(&missing, Vec2::ONE).is_none());
        assert!(!store.set_collision(&missing, true));
        assert!(!store.set_z_index(&missing, 3));
    }
}
