mod animations;
mod library;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::TextureKey;
use crate::world::{AnimationConfig, AssetId};

pub use animations::{animation_key_for, AnimationRegistry};
pub use library::{MemoryAssetLibrary, MemoryLibraryError};

/// Library entry for one generated asset. Also the shape embedded into
/// exported world documents as `assetData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: AssetId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_data: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationConfig>,
}

impl AssetRecord {
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetLibraryError {
    #[error("asset '{0}' has no image data")]
    MissingImageData(AssetId),
    #[error("asset '{0}' is not registered")]
    UnknownAsset(AssetId),
    #[error("failed to load texture for asset '{asset_id}': {reason}")]
    TextureLoad { asset_id: AssetId, reason: String },
    #[error("failed to create animation '{key}': {reason}")]
    Animation { key: String, reason: String },
}

/// Source of asset records, textures and animations.
pub trait AssetLibrary {
    fn resolve(&self, asset_id: &AssetId) -> Option<AssetRecord>;
    fn register_from_embedded(&mut self, record: AssetRecord) -> Result<(), AssetLibraryError>;
    /// Loads the record's texture if it is not cached yet and returns its key.
    fn load_texture(&mut self, record: &AssetRecord) -> Result<TextureKey, AssetLibraryError>;
    fn create_animation(
        &mut self,
        record: &AssetRecord,
        key: &str,
        config: &AnimationConfig,
    ) -> Result<(), AssetLibraryError>;
}
