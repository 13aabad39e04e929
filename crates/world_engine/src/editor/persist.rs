use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{WorldEditor, WorldEvent};
use crate::assets::AssetLibrary;
use crate::persistence::{
    build_document, parse_instance_entry, validate_import, ImportValidationError,
    InstanceRestoreError, PersistenceError, RestoreReport, SaveReceipt, SkippedInstance,
    WorldDocument, WorldStorage, WORLD_DOCUMENT_VERSION,
};
use crate::render::Renderer;
use crate::world::{clamp_scale, epoch_millis, InstanceId, PlacedInstance};

impl<R, L, S> WorldEditor<R, L, S>
where
    R: Renderer,
    L: AssetLibrary,
    S: WorldStorage,
{
    /// Writes immediately and drops any pending trailing save.
    pub fn save_now(&mut self) -> Result<SaveReceipt, PersistenceError> {
        self.debouncer.cancel();
        self.flush_save()
    }

    pub(super) fn flush_save(&mut self) -> Result<SaveReceipt, PersistenceError> {
        let asset_count = self.store.len();
        match self.write_document(asset_count) {
            Ok(receipt) => {
                debug!(
                    asset_count,
                    bytes = receipt.bytes,
                    key = %self.config.storage_key,
                    "world_saved"
                );
                self.events.push(WorldEvent::WorldSaved {
                    asset_count,
                    timestamp_ms: receipt.timestamp_ms,
                });
                Ok(receipt)
            }
            Err(save_error) => {
                error!(asset_count, error = %save_error, "world_save_failed");
                self.events.push(WorldEvent::WorldSaveError {
                    error: save_error.to_string(),
                    asset_count,
                });
                Err(save_error)
            }
        }
    }

    fn write_document(&mut self, asset_count: usize) -> Result<SaveReceipt, PersistenceError> {
        let document = build_document::<L>(&self.store, self.renderer.camera(), None);
        let text = serde_json::to_string(&document).map_err(PersistenceError::Encode)?;
        self.storage
            .write(&self.config.storage_key, &text)
            .map_err(|source| PersistenceError::Storage {
                source,
                asset_count,
            })?;
        Ok(SaveReceipt {
            asset_count,
            timestamp_ms: epoch_millis(),
            bytes: text.len(),
        })
    }

    /// Replaces the current world with the stored one. Instances whose asset
    /// cannot be resolved are skipped and listed in the report.
    pub fn load_world(&mut self) -> Result<RestoreReport, PersistenceError> {
        let raw = self
            .storage
            .read(&self.config.storage_key)
            .map_err(PersistenceError::Read)?;
        let Some(raw) = raw else {
            info!(key = %self.config.storage_key, "load_world_empty");
            return Ok(RestoreReport::default());
        };

        let document: Value =
            serde_json::from_str(&raw).map_err(|parse_error| PersistenceError::Parse {
                path: self.config.storage_key.clone(),
                message: parse_error.to_string(),
            })?;
        let report = self.restore_document(document)?;
        info!(
            restored = report.restored,
            skipped = report.skipped.len(),
            "world_loaded"
        );
        Ok(report)
    }

    /// Snapshot with every referenced asset embedded.
    pub fn export_document(&self) -> WorldDocument {
        build_document(&self.store, self.renderer.camera(), Some(&self.library))
    }

    pub fn export_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(&self.export_document()).map_err(PersistenceError::Encode)
    }

    pub fn import_json(&mut self, raw: &str) -> Result<RestoreReport, PersistenceError> {
        let document: Value = serde_json::from_str(raw)
            .map_err(|parse_error| ImportValidationError::MalformedJson(parse_error.to_string()))?;
        self.import_value(document)
    }

    /// Validates the whole document before touching the world, then clears,
    /// restores entry by entry and saves. A failed save is reported, not
    /// returned as an error, since the world itself was imported.
    pub fn import_value(&mut self, document: Value) -> Result<RestoreReport, PersistenceError> {
        let mut report = self.restore_document(document)?;

        self.debouncer.cancel();
        if let Err(save_error) = self.flush_save() {
            report.save_error = Some(save_error.to_string());
        }
        info!(
            restored = report.restored,
            skipped = report.skipped.len(),
            saved = report.save_error.is_none(),
            "world_imported"
        );
        Ok(report)
    }

    fn restore_document(&mut self, document: Value) -> Result<RestoreReport, PersistenceError> {
        let validated = validate_import(document)?;
        let mut report = RestoreReport {
            document_found: true,
            ..RestoreReport::default()
        };
        if validated.version != WORLD_DOCUMENT_VERSION {
            warn!(
                found = %validated.version,
                expected = WORLD_DOCUMENT_VERSION,
                "world_document_version_mismatch"
            );
            report.version_mismatch = Some(validated.version.clone());
        }

        self.placement.cancel(&mut self.renderer);
        self.clear_instances();

        let header = validated.header;
        if let Some(world_name) = header.world_name {
            self.store.set_world_name(world_name);
        }
        if let Some(created_at) = header.created_at.as_ref().and_then(Value::as_u64) {
            self.store.set_created_at_ms(created_at);
        }
        if let Some(world_size) = header.world_size {
            self.store.set_world_size(world_size);
        }
        if let Some(spawn) = header.player_spawn {
            self.store.set_player_spawn(spawn);
        }
        if let Some(camera) = header.camera_position {
            self.renderer.set_camera(camera);
        }

        for (index, entry) in validated.entries.into_iter().enumerate() {
            let instance_id = entry
                .get("instanceId")
                .and_then(Value::as_str)
                .map(|id| InstanceId(id.to_string()));
            match self.restore_instance(entry) {
                Ok(()) => report.restored += 1,
                Err(restore_error) => {
                    warn!(
                        index,
                        instance_id = ?instance_id.as_ref().map(InstanceId::as_str),
                        error = %restore_error,
                        "restore_instance_skipped"
                    );
                    report.skipped.push(SkippedInstance {
                        index,
                        instance_id,
                        error: restore_error,
                    });
                }
            }
        }

        Ok(report)
    }

    fn restore_instance(&mut self, entry: Value) -> Result<(), InstanceRestoreError> {
        let saved = parse_instance_entry(entry)?;
        if self.store.contains(&saved.instance_id) {
            return Err(InstanceRestoreError::DuplicateInstance(saved.instance_id));
        }

        let record = match (self.library.resolve(&saved.asset_id), saved.asset_data) {
            (Some(record), _) => record,
            (None, Some(mut embedded)) => {
                embedded.id = saved.asset_id.clone();
                self.library.register_from_embedded(embedded.clone())?;
                debug!(asset_id = %saved.asset_id, "asset_registered_from_embedded");
                embedded
            }
            (None, None) => {
                return Err(InstanceRestoreError::Unresolved {
                    asset_id: saved.asset_id,
                })
            }
        };

        let texture = self.library.load_texture(&record)?;
        let mut animation = self.animations.ensure(&mut self.library, &record)?;
        if let (Some(binding), Some(config)) = (animation.as_mut(), saved.animation_config) {
            binding.config = config;
        }

        let scale = clamp_scale(saved.scale);
        let handle = self
            .pool
            .acquire(&mut self.renderer, &texture, saved.position);
        self.renderer.set_rotation(handle, saved.rotation);
        self.renderer.set_scale(handle, scale);
        self.renderer.set_depth(handle, saved.z_index);
        if let Some(binding) = &animation {
            self.renderer.play_animation(handle, &binding.key);
        }
        if saved.collision_enabled {
            self.renderer.set_physics_enabled(handle, true);
            self.renderer.refresh_physics_body(handle);
        }

        let instance = PlacedInstance {
            instance_id: saved.instance_id.clone(),
            asset_id: saved.asset_id,
            position: saved.position,
            rotation: saved.rotation,
            scale,
            collision_enabled: saved.collision_enabled,
            z_index: saved.z_index,
            animation,
            handle,
        };
        if self.store.insert(instance).is_err() {
            self.pool.release(&mut self.renderer, handle, &texture);
            return Err(InstanceRestoreError::DuplicateInstance(saved.instance_id));
        }
        Ok(())
    }
}
