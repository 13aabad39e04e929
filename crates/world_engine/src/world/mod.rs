mod store;
mod types;

pub(crate) use store::epoch_millis;
pub use store::{InstanceIdAllocator, StoreError, WorldStore};
pub use types::{
    clamp_scale, clamp_scale_axis, step_scale_axis, AnimationBinding, AnimationConfig, AssetId,
    CameraState, InstanceId, PlacedInstance, Vec2, WorldMeta, WorldSize, SCALE_MAX, SCALE_MIN,
};
