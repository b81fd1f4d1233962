use crate::viewport::{hit_test_last_where, hit_test_where, Viewport2D, DEFAULT_HIT_RADIUS};
use crate::ViewAction;
use glam::DVec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Which marker wins when several are under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickOrder {
    /// Lowest index first.
    #[default]
    First,
    /// Most recently added first.
    Last,
}

/// A clickable marker in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub position: DVec2,
    pub selectable: bool,
}

impl Target {
    pub fn new(position: DVec2) -> Self {
        Self {
            position,
            selectable: true,
        }
    }
}

/// Turns window mouse events into view actions for one chart canvas.
///
/// The canvas is assumed to sit at the window origin, so cursor positions are
/// canvas pixels.
pub struct InteractionManager {
    viewport: Viewport2D,
    targets: Vec<Target>,
    pick: PickOrder,
    hit_radius: f64,
    /// Marker currently under the pointer.
    pub hovered: Option<usize>,
    cursor: DVec2,
}

impl InteractionManager {
    pub fn new(viewport: Viewport2D) -> Self {
        Self {
            viewport,
            targets: Vec::new(),
            pick: PickOrder::First,
            hit_radius: DEFAULT_HIT_RADIUS,
            hovered: None,
            cursor: DVec2::ZERO,
        }
    }

    pub fn with_pick_order(mut self, pick: PickOrder) -> Self {
        self.pick = pick;
        self
    }

    pub fn with_hit_radius(mut self, radius: f64) -> Self {
        self.hit_radius = radius;
        self
    }

    pub fn viewport(&self) -> &Viewport2D {
        &self.viewport
    }

    pub fn cursor(&self) -> DVec2 {
        self.cursor
    }

    /// Replace the markers. Hover is cleared if it no longer points anywhere.
    pub fn set_targets(&mut self, targets: Vec<Target>) {
        self.targets = targets;
        if self.hovered.is_some_and(|i| i >= self.targets.len()) {
            self.hovered = None;
        }
    }

    pub fn on_resized(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
    }

    fn pick_at(&self, pointer: DVec2) -> Option<usize> {
        let content = self.viewport.to_content(pointer);
        let positions: Vec<DVec2> = self.targets.iter().map(|t| t.position).collect();
        let selectable = |i: usize| self.targets[i].selectable;
        match self.pick {
            PickOrder::First => hit_test_where(content, &positions, self.hit_radius, selectable),
            PickOrder::Last => hit_test_last_where(content, &positions, self.hit_radius, selectable),
        }
    }

    pub fn on_cursor_moved(&mut self, x: f64, y: f64) -> Option<ViewAction> {
        self.cursor = DVec2::new(x, y);

        if self.viewport.drag_to(self.cursor) {
            return Some(ViewAction::Pan(self.viewport.origin()));
        }

        let hovered = if self.viewport.contains(self.cursor) {
            self.pick_at(self.cursor)
        } else {
            None
        };
        if hovered != self.hovered {
            self.hovered = hovered;
            return Some(ViewAction::Hover(hovered));
        }
        None
    }

    /// A left press starts a drag and selects the marker under the pointer.
    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) -> Option<ViewAction> {
        if button != MouseButton::Left {
            return None;
        }

        match state {
            ElementState::Pressed => {
                if !self.viewport.begin_drag(self.cursor) {
                    return None;
                }
                self.pick_at(self.cursor).map(|index| {
                    tracing::debug!(index, "Marker selected");
                    ViewAction::Select(index)
                })
            }
            ElementState::Released => {
                self.viewport.end_drag();
                None
            }
        }
    }

    pub fn on_scroll(&mut self, delta: MouseScrollDelta) -> Option<ViewAction> {
        // Wheel up reports a positive y and should zoom in.
        let wheel_delta = match delta {
            MouseScrollDelta::LineDelta(_, y) => -f64::from(y),
            MouseScrollDelta::PixelDelta(pos) => -pos.y / 100.0,
        };

        let before = self.viewport.state();
        if !self.viewport.apply_zoom(self.cursor, wheel_delta) {
            return None;
        }
        let after = self.viewport.state();
        (after != before).then_some(ViewAction::Zoom {
            scale: after.scale,
            origin: after.origin,
        })
    }
}
