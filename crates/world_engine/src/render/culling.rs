use super::Renderer;
use crate::world::PlacedInstance;

pub const DEFAULT_CULLING_MARGIN: f32 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullingStats {
    pub total: usize,
    pub visible: usize,
    pub culled: usize,
}

/// Per-frame viewport culling. Hidden instances also lose their physics body
/// so off-screen statics cost nothing.
#[derive(Debug)]
pub struct CullingEngine {
    enabled: bool,
    margin: f32,
    last_stats: CullingStats,
}

impl Default for CullingEngine {
    fn default() -> Self {
        Self::new(true, DEFAULT_CULLING_MARGIN)
    }
}

impl CullingEngine {
    pub fn new(enabled: bool, margin: f32) -> Self {
        Self {
            enabled,
            margin: sanitize_margin(margin),
            last_stats: CullingStats::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn set_margin(&mut self, margin: f32) {
        self.margin = sanitize_margin(margin);
    }

    pub fn last_stats(&self) -> CullingStats {
        self.last_stats
    }

    /// Turning culling off shows everything and restores physics from each
    /// instance's collision flag.
    pub fn set_enabled<R: Renderer>(
        &mut self,
        renderer: &mut R,
        instances: &[PlacedInstance],
        enabled: bool,
    ) {
        self.enabled = enabled;
        if enabled {
            return;
        }
        for instance in instances {
            renderer.set_visible(instance.handle, true);
            renderer.set_physics_enabled(instance.handle, instance.collision_enabled);
        }
        self.last_stats = CullingStats {
            total: instances.len(),
            visible: instances.len(),
            culled: 0,
        };
    }

    pub fn update<R: Renderer>(
        &mut self,
        renderer: &mut R,
        instances: &[PlacedInstance],
    ) -> CullingStats {
        if instances.is_empty() {
            self.last_stats = CullingStats::default();
            return self.last_stats;
        }
        if !self.enabled {
            self.last_stats = CullingStats {
                total: instances.len(),
                visible: instances.len(),
                culled: 0,
            };
            return self.last_stats;
        }

        let bounds = renderer.camera_view().expanded(self.margin);
        let mut stats = CullingStats {
            total: instances.len(),
            ..CullingStats::default()
        };

        for instance in instances {
            let Some(geometry) = renderer.geometry(instance.handle) else {
                continue;
            };
            let visible = geometry.aabb().intersects(&bounds);
            if visible {
                stats.visible += 1;
            } else {
                stats.culled += 1;
            }

            if renderer.is_visible(instance.handle) == visible {
                continue;
            }
            renderer.set_visible(instance.handle, visible);
            renderer.set_physics_enabled(instance.handle, visible && instance.collision_enabled);
        }

        self.last_stats = stats;
        stats
    }
}

fn sanitize_margin(margin: f32) -> f32 {
    if margin.is_nan() {
        return 0.0;
    }
    margin.max(0.0)
}
