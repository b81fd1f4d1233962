pub mod mouse;
pub mod viewport;

use glam::DVec2;

/// Describes a change to a chart view produced by pointer input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewAction {
    /// Origin moved by a drag.
    Pan(DVec2),
    /// Scale and origin changed by the wheel.
    Zoom { scale: f64, origin: DVec2 },
    /// Hovered marker changed.
    Hover(Option<usize>),
    /// Marker clicked.
    Select(usize),
}
