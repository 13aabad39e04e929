use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{ImportValidationError, InstanceRestoreError};
use crate::assets::{AssetLibrary, AssetRecord};
use crate::world::{
    AnimationConfig, AssetId, CameraState, InstanceId, PlacedInstance, Vec2, WorldSize,
    WorldStore,
};

pub const WORLD_DOCUMENT_VERSION: &str = "1.0";

fn unit_scale() -> Vec2 {
    Vec2::ONE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedInstance {
    pub instance_id: InstanceId,
    pub asset_id: AssetId,
    pub position: Vec2,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "unit_scale")]
    pub scale: Vec2,
    #[serde(default)]
    pub collision_enabled: bool,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub animation_key: Option<String>,
    #[serde(default)]
    pub animation_config: Option<AnimationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_data: Option<AssetRecord>,
}

impl SavedInstance {
    pub fn from_instance(instance: &PlacedInstance) -> Self {
        Self {
            instance_id: instance.instance_id.clone(),
            asset_id: instance.asset_id.clone(),
            position: instance.position,
            rotation: instance.rotation,
            scale: instance.scale,
            collision_enabled: instance.collision_enabled,
            z_index: instance.z_index,
            animation_key: instance.animation.as_ref().map(|binding| binding.key.clone()),
            animation_config: instance.animation.as_ref().map(|binding| binding.config),
            asset_data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDocument {
    pub version: String,
    pub world_name: String,
    #[serde(default)]
    pub created_at: u64,
    pub world_size: WorldSize,
    pub placed_instances: Vec<SavedInstance>,
    pub player_spawn: Vec2,
    pub camera_position: CameraState,
}

/// Snapshot of the store. With `embed_from`, every instance also carries its
/// asset record so the document can be imported into an empty library.
pub fn build_document<L: AssetLibrary>(
    store: &WorldStore,
    camera: CameraState,
    embed_from: Option<&L>,
) -> WorldDocument {
    let meta = store.meta();
    let placed_instances = store
        .instances()
        .iter()
        .map(|instance| {
            let mut saved = SavedInstance::from_instance(instance);
            if let Some(library) = embed_from {
                saved.asset_data = library.resolve(&instance.asset_id);
                if saved.asset_data.is_none() {
                    warn!(
                        instance_id = %instance.instance_id,
                        asset_id = %instance.asset_id,
                        "export_asset_unresolved"
                    );
                }
            }
            saved
        })
        .collect();

    WorldDocument {
        version: WORLD_DOCUMENT_VERSION.to_string(),
        world_name: meta.world_name.clone(),
        created_at: meta.created_at_ms,
        world_size: meta.world_size,
        placed_instances,
        player_spawn: meta.player_spawn,
        camera_position: camera,
    }
}

/// Optional world metadata accepted on import.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportHeader {
    #[serde(default)]
    pub(crate) world_name: Option<String>,
    /// Older documents store a date string here; only epoch millis are kept.
    #[serde(default)]
    pub(crate) created_at: Option<Value>,
    #[serde(default)]
    pub(crate) world_size: Option<WorldSize>,
    #[serde(default)]
    pub(crate) player_spawn: Option<Vec2>,
    #[serde(default)]
    pub(crate) camera_position: Option<CameraState>,
}

#[derive(Debug)]
pub(crate) struct ValidatedImport {
    pub(crate) version: String,
    pub(crate) header: ImportHeader,
    pub(crate) entries: Vec<Value>,
}

/// Document-level checks, in order: non-null, object, `version`,
/// `placedInstances` as a sequence, then the optional metadata. Nothing is
/// mutated before this passes.
pub(crate) fn validate_import(document: Value) -> Result<ValidatedImport, ImportValidationError> {
    let mut object = match document {
        Value::Null => return Err(ImportValidationError::NullDocument),
        Value::Object(object) => object,
        _ => return Err(ImportValidationError::NotAnObject),
    };

    let version = match object.remove("version") {
        None | Some(Value::Null) => return Err(ImportValidationError::MissingVersion),
        Some(Value::String(version)) => version,
        Some(other) => other.to_string(),
    };

    let entries = match object.remove("placedInstances") {
        None | Some(Value::Null) => return Err(ImportValidationError::MissingPlacedInstances),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(ImportValidationError::PlacedInstancesNotArray),
    };

    let header = serde_path_to_error::deserialize::<_, ImportHeader>(Value::Object(object))
        .map_err(|error| ImportValidationError::MalformedField {
            path: error.path().to_string(),
            message: error.into_inner().to_string(),
        })?;

    Ok(ValidatedImport {
        version,
        header,
        entries,
    })
}

pub(crate) fn parse_instance_entry(entry: Value) -> Result<SavedInstance, InstanceRestoreError> {
    serde_path_to_error::deserialize::<_, SavedInstance>(entry).map_err(|error| {
        let path = error.path().to_string();
        let message = error.into_inner().to_string();
        if path.is_empty() || path == "." {
            InstanceRestoreError::Malformed(message)
        } else {
            InstanceRestoreError::Malformed(format!("{path}: {message}"))
        }
    })
}
