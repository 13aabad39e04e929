use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::{AssetLibrary, AssetLibraryError, AssetRecord};
use crate::persistence::write_text_atomic;
use crate::render::TextureKey;
use crate::world::{AnimationConfig, AssetId};

const LIBRARY_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum MemoryLibraryError {
    #[error("failed to read asset library '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse asset library '{path}' at {json_path}: {message}")]
    Parse {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("unsupported asset library version {actual} (expected {expected})")]
    Version { expected: u32, actual: u32 },
    #[error("failed to encode asset library: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write asset library '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct LibraryFile {
    version: u32,
    assets: Vec<AssetRecord>,
}

/// Asset library kept in memory, optionally mirrored to a JSON file.
#[derive(Debug, Default)]
pub struct MemoryAssetLibrary {
    records: BTreeMap<AssetId, AssetRecord>,
    loaded_textures: HashSet<AssetId>,
    animations: HashMap<String, usize>,
}

impl MemoryAssetLibrary {
    pub fn insert(&mut self, record: AssetRecord) {
        self.loaded_textures.remove(&record.id);
        self.records.insert(record.id.clone(), record);
    }

    pub fn remove(&mut self, asset_id: &AssetId) -> Option<AssetRecord> {
        self.loaded_textures.remove(asset_id);
        self.records.remove(asset_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_texture_loaded(&self, asset_id: &AssetId) -> bool {
        self.loaded_textures.contains(asset_id)
    }

    pub fn animation_create_count(&self, key: &str) -> usize {
        self.animations.get(key).copied().unwrap_or(0)
    }

    pub fn texture_key_for(asset_id: &AssetId) -> TextureKey {
        TextureKey(format!("asset_{asset_id}"))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, MemoryLibraryError> {
        let raw = fs::read_to_string(path).map_err(|source| MemoryLibraryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        let file: LibraryFile =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
                MemoryLibraryError::Parse {
                    path: path.to_path_buf(),
                    json_path: error.path().to_string(),
                    message: error.into_inner().to_string(),
                }
            })?;
        if file.version != LIBRARY_FORMAT_VERSION {
            return Err(MemoryLibraryError::Version {
                expected: LIBRARY_FORMAT_VERSION,
                actual: file.version,
            });
        }

        let mut library = Self::default();
        for record in file.assets {
            library.insert(record);
        }
        info!(
            path = %path.display(),
            asset_count = library.len(),
            "asset_library_loaded"
        );
        Ok(library)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), MemoryLibraryError> {
        let file = LibraryFile {
            version: LIBRARY_FORMAT_VERSION,
            assets: self.records.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(MemoryLibraryError::Encode)?;
        write_text_atomic(path, &json).map_err(|source| MemoryLibraryError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl AssetLibrary for MemoryAssetLibrary {
    fn resolve(&self, asset_id: &AssetId) -> Option<AssetRecord> {
        self.records.get(asset_id).cloned()
    }

    fn register_from_embedded(&mut self, record: AssetRecord) -> Result<(), AssetLibraryError> {
        if record.image_data.is_empty() && record.frames.is_empty() {
            return Err(AssetLibraryError::MissingImageData(record.id));
        }
        debug!(asset_id = %record.id, "asset_registered_from_embedded");
        self.insert(record);
        Ok(())
    }

    fn load_texture(&mut self, record: &AssetRecord) -> Result<TextureKey, AssetLibraryError> {
        if !self.records.contains_key(&record.id) {
            return Err(AssetLibraryError::UnknownAsset(record.id.clone()));
        }
        if record.image_data.is_empty() && record.frames.is_empty() {
            return Err(AssetLibraryError::MissingImageData(record.id.clone()));
        }
        if self.loaded_textures.insert(record.id.clone()) {
            debug!(asset_id = %record.id, "texture_loaded");
        }
        Ok(Self::texture_key_for(&record.id))
    }

    fn create_animation(
        &mut self,
        record: &AssetRecord,
        key: &str,
        config: &AnimationConfig,
    ) -> Result<(), AssetLibraryError> {
        if record.frames.is_empty() {
            return Err(AssetLibraryError::Animation {
                key: key.to_string(),
                reason: "asset has no frames".to_string(),
            });
        }
        if !(config.frame_rate.is_finite() && config.frame_rate > 0.0) {
            return Err(AssetLibraryError::Animation {
                key: key.to_string(),
                reason: format!("invalid frame rate {}", config.frame_rate),
            });
        }
        *self.animations.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn record(id: &str, image_data: &str) -> AssetRecord {
        AssetRecord {
            id: AssetId(id.to_string()),
            name: format!("{id} name"),
            description: String::new(),
            category: "nature".to_string(),
            image_data: image_data.to_string(),
            frames: Vec::new(),
            generation_params: Some(serde_json::json!({ "prompt": id })),
            animation: None,
        }
    }

    #[test]
    fn load_texture_requires_registered_asset_with_image_data() {
        let mut library = MemoryAssetLibrary::default();
        let unknown = record("ghost", "data");
        assert_eq!(
            library.load_texture(&unknown),
            Err(AssetLibraryError::UnknownAsset(unknown.id.clone()))
        );

        let blank = record("blank", "");
        library.insert(blank.clone());
        assert_eq!(
            library.load_texture(&blank),
            Err(AssetLibraryError::MissingImageData(blank.id.clone()))
        );

        let tree = record("tree", "data:image/png;base64,AAAA");
        library.insert(tree.clone());
        let key = library.load_texture(&tree).expect("texture");
        assert_eq!(key, TextureKey("asset_tree".to_string()));
        assert!(library.is_texture_loaded(&tree.id));
    }

    #[test]
    fn register_from_embedded_makes_asset_resolvable() {
        let mut library = MemoryAssetLibrary::default();
        let tree = record("tree", "data:image/png;base64,AAAA");
        library
            .register_from_embedded(tree.clone())
            .expect("register");
        assert_eq!(library.resolve(&tree.id), Some(tree));
    }

    #[test]
    fn register_from_embedded_rejects_empty_image() {
        let mut library = MemoryAssetLibrary::default();
        let err = library
            .register_from_embedded(record("blank", ""))
            .expect_err("no image");
        assert!(matches!(err, AssetLibraryError::MissingImageData(_)));
        assert!(library.is_empty());
    }

    #[test]
    fn file_round_trip_preserves_records() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("library.json");
        let mut library = MemoryAssetLibrary::default();
        library.insert(record("tree", "AAAA"));
        library.insert(record("rock", "BBBB"));
        library.save_to_path(&path).expect("save");

        let loaded = MemoryAssetLibrary::load_from_path(&path).expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.resolve(&AssetId("rock".to_string())),
            Some(record("rock", "BBBB"))
        );
    }

    #[test]
    fn parse_error_reports_json_path() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("library.json");
        fs::write(&path, r#"{"version":1,"assets":[{"id":7}]}"#).expect("write");

        let err = MemoryAssetLibrary::load_from_path(&path).expect_err("bad id");
        match err {
            MemoryLibraryError::Parse { json_path, .. } => {
                assert_eq!(json_path, "assets[0].id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("library.json");
        fs::write(&path, r#"{"version":9,"assets":[]}"#).expect("write");

        let err = MemoryAssetLibrary::load_from_path(&path).expect_err("version");
        assert!(matches!(
            err,
            MemoryLibraryError::Version {
                expected: 1,
                actual: 9
            }
        ));
    }
}
