use tracing::debug;

use crate::render::{HandleId, Rect, Renderer, TextureKey};
use crate::world::{clamp_scale, InstanceId, Vec2};

use super::input::Modifiers;

pub(crate) const SELECTION_TINT: u32 = 0x66ccff;
pub(crate) const HANDLE_TEXTURE: &str = "editor_handle";
pub(crate) const HANDLE_DEPTH: i32 = 10_001;

/// Below this pointer-to-center distance a scale drag has no usable
/// reference length.
const MIN_DRAG_REFERENCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    fn is_horizontal_axis(self) -> bool {
        matches!(self, Edge::Left | Edge::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Corner(Corner),
    Edge(Edge),
    Rotate,
    Move,
}

/// Hit-test order: rotate first since it sits outside the bounds, move last
/// since it is covered by the instance body.
const HANDLE_KINDS: [HandleKind; 10] = [
    HandleKind::Rotate,
    HandleKind::Corner(Corner::TopLeft),
    HandleKind::Corner(Corner::TopRight),
    HandleKind::Corner(Corner::BottomLeft),
    HandleKind::Corner(Corner::BottomRight),
    HandleKind::Edge(Edge::Top),
    HandleKind::Edge(Edge::Bottom),
    HandleKind::Edge(Edge::Left),
    HandleKind::Edge(Edge::Right),
    HandleKind::Move,
];

pub fn handle_anchor(kind: HandleKind, bounds: &Rect, rotate_offset: f32) -> Vec2 {
    let center = bounds.center();
    match kind {
        HandleKind::Corner(Corner::TopLeft) => Vec2::new(bounds.left(), bounds.top()),
        HandleKind::Corner(Corner::TopRight) => Vec2::new(bounds.right(), bounds.top()),
        HandleKind::Corner(Corner::BottomLeft) => Vec2::new(bounds.left(), bounds.bottom()),
        HandleKind::Corner(Corner::BottomRight) => Vec2::new(bounds.right(), bounds.bottom()),
        HandleKind::Edge(Edge::Top) => Vec2::new(center.x, bounds.top()),
        HandleKind::Edge(Edge::Bottom) => Vec2::new(center.x, bounds.bottom()),
        HandleKind::Edge(Edge::Left) => Vec2::new(bounds.left(), center.y),
        HandleKind::Edge(Edge::Right) => Vec2::new(bounds.right(), center.y),
        HandleKind::Rotate => Vec2::new(center.x, bounds.top() - rotate_offset),
        HandleKind::Move => center,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleWidget {
    pub kind: HandleKind,
    pub position: Vec2,
    pub drawable: HandleId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSettings {
    pub move_snap_grid: f32,
    pub rotate_snap_degrees: f32,
}

/// State captured when a handle drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub kind: HandleKind,
    pub start_pointer: Vec2,
    pub center: Vec2,
    pub start_scale: Vec2,
    pub start_rotation: f32,
    /// Instance position minus pointer at drag start.
    pub move_offset: Vec2,
}

impl DragSession {
    pub fn begin(
        kind: HandleKind,
        pointer: Vec2,
        position: Vec2,
        rotation: f32,
        scale: Vec2,
    ) -> Self {
        Self {
            kind,
            start_pointer: pointer,
            center: position,
            start_scale: scale,
            start_rotation: rotation,
            move_offset: Vec2::new(position.x - pointer.x, position.y - pointer.y),
        }
    }

    /// Transform for the current pointer. `None` when the pointer gives no
    /// meaningful value (e.g. a scale drag that started on the center).
    pub fn update(
        &self,
        pointer: Vec2,
        modifiers: Modifiers,
        settings: &DragSettings,
    ) -> Option<DragUpdate> {
        if !pointer.is_finite() {
            return None;
        }
        match self.kind {
            HandleKind::Move => {
                let mut position = Vec2::new(
                    pointer.x + self.move_offset.x,
                    pointer.y + self.move_offset.y,
                );
                if modifiers.shift {
                    position = snap_to_grid(position, settings.move_snap_grid);
                }
                Some(DragUpdate::Position(position))
            }
            HandleKind::Rotate => {
                let angle = (pointer.y - self.center.y).atan2(pointer.x - self.center.x);
                let angle = if modifiers.shift {
                    snap_angle(angle, settings.rotate_snap_degrees)
                } else {
                    angle
                };
                Some(DragUpdate::Rotation(angle))
            }
            HandleKind::Corner(_) => {
                let start = self.start_pointer.distance(self.center);
                if start < MIN_DRAG_REFERENCE {
                    return None;
                }
                let factor = pointer.distance(self.center) / start;
                Some(DragUpdate::Scale(clamp_scale(Vec2::new(
                    self.start_scale.x * factor,
                    self.start_scale.y * factor,
                ))))
            }
            HandleKind::Edge(edge) => {
                let (start, current) = if edge.is_horizontal_axis() {
                    (
                        (self.start_pointer.x - self.center.x).abs(),
                        (pointer.x - self.center.x).abs(),
                    )
                } else {
                    (
                        (self.start_pointer.y - self.center.y).abs(),
                        (pointer.y - self.center.y).abs(),
                    )
                };
                if start < MIN_DRAG_REFERENCE {
                    return None;
                }
                let factor = current / start;
                let scale = if modifiers.ctrl {
                    Vec2::new(self.start_scale.x * factor, self.start_scale.y * factor)
                } else if edge.is_horizontal_axis() {
                    Vec2::new(self.start_scale.x * factor, self.start_scale.y)
                } else {
                    Vec2::new(self.start_scale.x, self.start_scale.y * factor)
                };
                Some(DragUpdate::Scale(clamp_scale(scale)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragUpdate {
    Position(Vec2),
    Rotation(f32),
    Scale(Vec2),
}

pub fn snap_to_grid(point: Vec2, grid: f32) -> Vec2 {
    if !grid.is_finite() || grid <= 0.0 {
        return point;
    }
    Vec2::new(
        (point.x / grid).round() * grid,
        (point.y / grid).round() * grid,
    )
}

/// Rounds `radians` to the nearest multiple of `step_degrees`.
pub fn snap_angle(radians: f32, step_degrees: f32) -> f32 {
    if !step_degrees.is_finite() || step_degrees <= 0.0 {
        return radians;
    }
    let degrees = radians.to_degrees();
    ((degrees / step_degrees).round() * step_degrees).to_radians()
}

#[derive(Debug, Clone, PartialEq)]
struct Selected {
    instance_id: InstanceId,
    drawable: HandleId,
    widgets: Vec<HandleWidget>,
}

/// Single-selection model with handle widgets and one in-flight drag.
#[derive(Debug, Default)]
pub struct SelectionController {
    selected: Option<Selected>,
    drag: Option<DragSession>,
}

impl SelectionController {
    pub fn selected(&self) -> Option<&InstanceId> {
        self.selected.as_ref().map(|selected| &selected.instance_id)
    }

    pub fn selected_drawable(&self) -> Option<HandleId> {
        self.selected.as_ref().map(|selected| selected.drawable)
    }

    pub fn widgets(&self) -> &[HandleWidget] {
        self.selected
            .as_ref()
            .map_or(&[], |selected| selected.widgets.as_slice())
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Replaces any current selection: the old instance loses its tint and
    /// widgets before the new one gets them.
    pub fn select<R: Renderer>(
        &mut self,
        renderer: &mut R,
        instance_id: InstanceId,
        drawable: HandleId,
        rotate_offset: f32,
    ) {
        self.deselect(renderer);

        renderer.set_tint(drawable, Some(SELECTION_TINT));
        let widgets = match renderer.geometry(drawable) {
            Some(geometry) => spawn_widgets(renderer, &geometry.aabb(), rotate_offset),
            None => Vec::new(),
        };
        debug!(instance_id = %instance_id, widgets = widgets.len(), "instance_selected");
        self.selected = Some(Selected {
            instance_id,
            drawable,
            widgets,
        });
    }

    /// Clears tint and widgets. An in-flight drag is discarded.
    pub fn deselect<R: Renderer>(&mut self, renderer: &mut R) -> Option<InstanceId> {
        self.drag = None;
        let selected = self.selected.take()?;
        renderer.set_tint(selected.drawable, None);
        for widget in &selected.widgets {
            renderer.destroy_sprite(widget.drawable);
        }
        Some(selected.instance_id)
    }

    /// Re-positions widgets after the selected instance's transform changed.
    pub fn layout_widgets<R: Renderer>(&mut self, renderer: &mut R, rotate_offset: f32) {
        let Some(selected) = self.selected.as_mut() else {
            return;
        };
        let Some(geometry) = renderer.geometry(selected.drawable) else {
            return;
        };
        let bounds = geometry.aabb();
        for widget in &mut selected.widgets {
            widget.position = handle_anchor(widget.kind, &bounds, rotate_offset);
            renderer.set_position(widget.drawable, widget.position);
        }
    }

    pub fn hit_handle(&self, point: Vec2, radius: f32) -> Option<HandleKind> {
        let selected = self.selected.as_ref()?;
        HANDLE_KINDS.iter().copied().find(|kind| {
            selected
                .widgets
                .iter()
                .any(|widget| widget.kind == *kind && widget.position.distance(point) <= radius)
        })
    }

    pub fn start_drag(&mut self, session: DragSession) -> bool {
        if self.selected.is_none() {
            return false;
        }
        self.drag = Some(session);
        true
    }

    pub fn update_drag(
        &self,
        pointer: Vec2,
        modifiers: Modifiers,
        settings: &DragSettings,
    ) -> Option<DragUpdate> {
        self.drag.as_ref()?.update(pointer, modifiers, settings)
    }

    pub fn stop_drag(&mut self) -> Option<DragSession> {
        self.drag.take()
    }
}

fn spawn_widgets<R: Renderer>(
    renderer: &mut R,
    bounds: &Rect,
    rotate_offset: f32,
) -> Vec<HandleWidget> {
    let texture = TextureKey(HANDLE_TEXTURE.to_string());
    HANDLE_KINDS
        .iter()
        .map(|&kind| {
            let position = handle_anchor(kind, bounds, rotate_offset);
            let drawable = renderer.create_sprite(&texture, position);
            renderer.set_depth(drawable, HANDLE_DEPTH);
            renderer.set_interactive(drawable, false);
            renderer.set_physics_enabled(drawable, false);
            HandleWidget {
                kind,
                position,
                drawable,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessRenderer;
    use crate::world::{SCALE_MAX, SCALE_MIN};

    fn settings() -> DragSettings {
        DragSettings {
            move_snap_grid: 16.0,
            rotate_snap_degrees: 15.0,
        }
    }

    fn session(kind: HandleKind, pointer: Vec2) -> DragSession {
        DragSession::begin(kind, pointer, Vec2::new(100.0, 100.0), 0.0, Vec2::ONE)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn shift_rotate_through_37_degrees_snaps_to_30() {
        let drag = session(HandleKind::Rotate, Vec2::new(100.0, 70.0));
        let angle = 37.0_f32.to_radians();
        let pointer = Vec2::new(100.0 + 50.0 * angle.cos(), 100.0 + 50.0 * angle.sin());

        let Some(DragUpdate::Rotation(snapped)) =
            drag.update(pointer, Modifiers::SHIFT, &settings())
        else {
            panic!("expected rotation");
        };
        assert!(approx(snapped, 30.0_f32.to_radians()));

        let Some(DragUpdate::Rotation(raw)) = drag.update(pointer, Modifiers::NONE, &settings())
        else {
            panic!("expected rotation");
        };
        assert!(approx(raw, angle));
    }

    #[test]
    fn move_keeps_grab_offset_and_snaps_with_shift() {
        let drag = session(HandleKind::Move, Vec2::new(110.0, 95.0));
        assert_eq!(
            drag.update(Vec2::new(120.0, 105.0), Modifiers::NONE, &settings()),
            Some(DragUpdate::Position(Vec2::new(110.0, 110.0)))
        );
        assert_eq!(
            drag.update(Vec2::new(125.0, 105.0), Modifiers::SHIFT, &settings()),
            Some(DragUpdate::Position(Vec2::new(112.0, 112.0)))
        );
    }

    #[test]
    fn corner_scale_is_aspect_locked_and_clamped() {
        let drag = session(HandleKind::Corner(Corner::BottomRight), Vec2::new(110.0, 100.0));
        assert_eq!(
            drag.update(Vec2::new(120.0, 100.0), Modifiers::NONE, &settings()),
            Some(DragUpdate::Scale(Vec2::new(2.0, 2.0)))
        );
        assert_eq!(
            drag.update(Vec2::new(1100.0, 100.0), Modifiers::NONE, &settings()),
            Some(DragUpdate::Scale(Vec2::new(SCALE_MAX, SCALE_MAX)))
        );
        assert_eq!(
            drag.update(Vec2::new(100.0, 100.0), Modifiers::NONE, &settings()),
            Some(DragUpdate::Scale(Vec2::new(SCALE_MIN, SCALE_MIN)))
        );
    }

    #[test]
    fn edge_scale_touches_one_axis_unless_ctrl() {
        let drag = session(HandleKind::Edge(Edge::Right), Vec2::new(120.0, 100.0));
        assert_eq!(
            drag.update(Vec2::new(130.0, 140.0), Modifiers::NONE, &settings()),
            Some(DragUpdate::Scale(Vec2::new(1.5, 1.0)))
        );
        assert_eq!(
            drag.update(Vec2::new(130.0, 140.0), Modifiers::CTRL, &settings()),
            Some(DragUpdate::Scale(Vec2::new(1.5, 1.5)))
        );

        let vertical = session(HandleKind::Edge(Edge::Top), Vec2::new(100.0, 80.0));
        assert_eq!(
            vertical.update(Vec2::new(100.0, 60.0), Modifiers::NONE, &settings()),
            Some(DragUpdate::Scale(Vec2::new(1.0, 2.0)))
        );
    }

    #[test]
    fn scale_drag_started_on_center_yields_nothing() {
        let drag = session(HandleKind::Corner(Corner::TopLeft), Vec2::new(100.0, 100.0));
        assert_eq!(
            drag.update(Vec2::new(150.0, 150.0), Modifiers::NONE, &settings()),
            None
        );
    }

    #[test]
    fn widgets_follow_bounds_with_rotate_handle_above_top_center() {
        let bounds = Rect::new(0.0, 0.0, 64.0, 32.0);
        assert_eq!(
            handle_anchor(HandleKind::Rotate, &bounds, 30.0),
            Vec2::new(32.0, -30.0)
        );
        assert_eq!(
            handle_anchor(HandleKind::Edge(Edge::Left), &bounds, 30.0),
            Vec2::new(0.0, 16.0)
        );
        assert_eq!(
            handle_anchor(HandleKind::Corner(Corner::BottomRight), &bounds, 30.0),
            Vec2::new(64.0, 32.0)
        );
    }

    #[test]
    fn selecting_another_instance_clears_previous_tint_and_widgets() {
        let mut renderer = HeadlessRenderer::default();
        let texture = TextureKey("asset_tree".to_string());
        let first = renderer.create_sprite(&texture, Vec2::new(0.0, 0.0));
        let second = renderer.create_sprite(&texture, Vec2::new(200.0, 0.0));
        let mut selection = SelectionController::default();

        selection.select(&mut renderer, InstanceId("a".to_string()), first, 30.0);
        assert_eq!(selection.widgets().len(), HANDLE_KINDS.len());
        assert_eq!(
            renderer.sprite(first).expect("first").tint,
            Some(SELECTION_TINT)
        );

        selection.select(&mut renderer, InstanceId("b".to_string()), second, 30.0);
        assert_eq!(renderer.sprite(first).expect("first").tint, None);
        assert_eq!(
            renderer.sprite(second).expect("second").tint,
            Some(SELECTION_TINT)
        );
        assert_eq!(renderer.live_sprite_count(), 2 + HANDLE_KINDS.len());
        assert_eq!(selection.selected(), Some(&InstanceId("b".to_string())));
    }

    #[test]
    fn hit_handle_prefers_rotate_and_respects_radius() {
        let mut renderer = HeadlessRenderer::default();
        let drawable = renderer.create_sprite(&TextureKey("t".to_string()), Vec2::new(0.0, 0.0));
        let mut selection = SelectionController::default();
        assert_eq!(selection.hit_handle(Vec2::ZERO, 10.0), None);

        selection.select(&mut renderer, InstanceId("a".to_string()), drawable, 30.0);
        // 64x64 frame centered on the origin.
        assert_eq!(
            selection.hit_handle(Vec2::new(0.0, -60.0), 10.0),
            Some(HandleKind::Rotate)
        );
        assert_eq!(
            selection.hit_handle(Vec2::new(34.0, 30.0), 10.0),
            Some(HandleKind::Corner(Corner::BottomRight))
        );
        assert_eq!(
            selection.hit_handle(Vec2::new(2.0, 1.0), 10.0),
            Some(HandleKind::Move)
        );
        assert_eq!(selection.hit_handle(Vec2::new(16.0, 16.0), 10.0), None);
    }

    #[test]
    fn deselect_discards_drag_and_widgets() {
        let mut renderer = HeadlessRenderer::default();
        let drawable = renderer.create_sprite(&TextureKey("t".to_string()), Vec2::ZERO);
        let mut selection = SelectionController::default();
        assert!(!selection.start_drag(session(HandleKind::Move, Vec2::ZERO)));

        selection.select(&mut renderer, InstanceId("a".to_string()), drawable, 30.0);
        assert!(selection.start_drag(session(HandleKind::Move, Vec2::ZERO)));
        assert_eq!(
            selection.deselect(&mut renderer),
            Some(InstanceId("a".to_string()))
        );
        assert!(!selection.is_dragging());
        assert_eq!(renderer.live_sprite_count(), 1);
    }
}
