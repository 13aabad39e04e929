use std::collections::HashSet;

use tracing::debug;

use super::{AssetLibrary, AssetLibraryError, AssetRecord};
use crate::world::{AnimationBinding, AssetId};

pub fn animation_key_for(asset_id: &AssetId) -> String {
    format!("anim_{asset_id}")
}

/// Tracks which per-asset animations already exist so each is created once.
#[derive(Debug, Default)]
pub struct AnimationRegistry {
    created: HashSet<String>,
}

impl AnimationRegistry {
    /// Returns the binding for animated assets, creating the shared animation
    /// on first use. Single-frame assets yield `None`.
    pub fn ensure<L: AssetLibrary>(
        &mut self,
        library: &mut L,
        record: &AssetRecord,
    ) -> Result<Option<AnimationBinding>, AssetLibraryError> {
        if !record.is_animated() {
            return Ok(None);
        }

        let key = animation_key_for(&record.id);
        let config = record.animation.unwrap_or_default();
        if !self.created.contains(&key) {
            library.create_animation(record, &key, &config)?;
            debug!(
                asset_id = %record.id,
                key = %key,
                frame_count = record.frames.len(),
                "animation_created"
            );
            self.created.insert(key.clone());
        }

        Ok(Some(AnimationBinding { key, config }))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.created.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetLibrary;

    fn animated(id: &str) -> AssetRecord {
        AssetRecord {
            id: AssetId(id.to_string()),
            name: id.to_string(),
            description: String::new(),
            category: "props".to_string(),
            image_data: "data:image/png;base64,AAAA".to_string(),
            frames: vec!["f0".to_string(), "f1".to_string()],
            generation_params: None,
            animation: None,
        }
    }

    #[test]
    fn animation_is_created_once_per_asset() {
        let mut library = MemoryAssetLibrary::default();
        let mut registry = AnimationRegistry::default();
        let record = animated("torch");

        let first = registry.ensure(&mut library, &record).expect("first");
        let second = registry.ensure(&mut library, &record).expect("second");

        assert_eq!(first, second);
        assert_eq!(library.animation_create_count("anim_torch"), 1);
        assert!(registry.contains("anim_torch"));
    }

    #[test]
    fn single_frame_asset_has_no_animation() {
        let mut library = MemoryAssetLibrary::default();
        let mut registry = AnimationRegistry::default();
        let mut record = animated("rock");
        record.frames.truncate(1);

        assert_eq!(registry.ensure(&mut library, &record).expect("ok"), None);
        assert_eq!(library.animation_create_count("anim_rock"), 0);
    }
}
