use std::time::Duration;

use crate::persistence::DEFAULT_SAVE_DEBOUNCE;
use crate::render::DEFAULT_CULLING_MARGIN;
use crate::world::WorldSize;

pub const DEFAULT_MAX_ASSETS: usize = 500;
pub const DEFAULT_ASSET_WARNING_THRESHOLD: usize = 450;
pub const DEFAULT_STORAGE_KEY: &str = "world_state";

#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub world_name: String,
    pub world_size: WorldSize,
    pub culling_enabled: bool,
    pub culling_margin: f32,
    pub save_debounce: Duration,
    pub storage_key: String,
    pub max_assets: usize,
    pub asset_warning_threshold: usize,
    pub move_snap_grid: f32,
    pub rotate_snap_degrees: f32,
    pub key_rotate_step_degrees: f32,
    pub key_scale_step: f32,
    pub handle_hit_radius: f32,
    pub rotate_handle_offset: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            world_name: "Untitled World".to_string(),
            world_size: WorldSize {
                width: 3200.0,
                height: 3200.0,
            },
            culling_enabled: true,
            culling_margin: DEFAULT_CULLING_MARGIN,
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_assets: DEFAULT_MAX_ASSETS,
            asset_warning_threshold: DEFAULT_ASSET_WARNING_THRESHOLD,
            move_snap_grid: 16.0,
            rotate_snap_degrees: 15.0,
            key_rotate_step_degrees: 22.5,
            key_scale_step: 0.1,
            handle_hit_radius: 10.0,
            rotate_handle_offset: 30.0,
        }
    }
}
