use glam::DVec2;

pub const MIN_SCALE: f64 = 1.0;
pub const MAX_SCALE: f64 = 2.0;
/// Relative scale change per wheel notch.
pub const DEFAULT_ZOOM_STEP: f64 = 0.02;
/// Pointer hit radius for point markers, in pixels.
pub const DEFAULT_HIT_RADIUS: f64 = 15.0;

/// Rounds halves towards positive infinity, matching how plotted points
/// were snapped to pixels in recorded screenshots.
fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Fixed plotting region inside a canvas, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PlotRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn centre(&self) -> DVec2 {
        DVec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn contains(&self, pt: DVec2) -> bool {
        pt.x >= self.x && pt.x <= self.x + self.w && pt.y >= self.y && pt.y <= self.y + self.h
    }

    /// Map a calibration-relative domain point (roughly `[-1, 1]`) to pixels.
    ///
    /// Domain `+y` is up, screen `+y` is down.
    pub fn domain_to_screen(&self, pt: DVec2) -> DVec2 {
        DVec2::new(
            self.x + self.w / 2.0 + round_half_up(self.w / 2.0 * pt.x),
            self.y + self.h / 2.0 - round_half_up(self.h / 2.0 * pt.y),
        )
    }

    /// Inverse of [`Self::domain_to_screen`], without the pixel snapping.
    pub fn screen_to_domain(&self, pt: DVec2) -> DVec2 {
        let c = self.centre();
        DVec2::new((pt.x - c.x) / (self.w / 2.0), (c.y - pt.y) / (self.h / 2.0))
    }
}

/// Pan and zoom of a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Zoom factor in `[MIN_SCALE, MAX_SCALE]`.
    pub scale: f64,
    /// Translation applied before scaling, in canvas pixels. Never positive.
    pub origin: DVec2,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scale: MIN_SCALE,
            origin: DVec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PanStart {
    pointer: DVec2,
    origin: DVec2,
}

/// Pannable, zoomable view over a fixed-size canvas.
///
/// Content is drawn as `origin + scale * p`. The origin is kept inside
/// `[-canvas * (scale - 1), 0]` on each axis so zoomed content always covers
/// the canvas.
#[derive(Debug, Clone)]
pub struct Viewport2D {
    state: ViewportState,
    canvas: DVec2,
    zoom_step: f64,
    pan: Option<PanStart>,
}

impl Viewport2D {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            state: ViewportState::default(),
            canvas: DVec2::new(width, height),
            zoom_step: DEFAULT_ZOOM_STEP,
            pan: None,
        }
    }

    /// Steps outside `(0, 1)` are ignored.
    pub fn with_zoom_step(mut self, zoom_step: f64) -> Self {
        if zoom_step > 0.0 && zoom_step < 1.0 {
            self.zoom_step = zoom_step;
        }
        self
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn origin(&self) -> DVec2 {
        self.state.origin
    }

    pub fn canvas_size(&self) -> DVec2 {
        self.canvas
    }

    pub fn is_dragging(&self) -> bool {
        self.pan.is_some()
    }

    /// Whether a pointer position (canvas pixels) lies on the canvas.
    pub fn contains(&self, pointer: DVec2) -> bool {
        pointer.x >= 0.0 && pointer.x <= self.canvas.x && pointer.y >= 0.0 && pointer.y <= self.canvas.y
    }

    /// Allowed origin range `(min, max)` at the current scale.
    pub fn origin_bounds(&self) -> (DVec2, DVec2) {
        (-self.canvas * (self.state.scale - 1.0), DVec2::ZERO)
    }

    fn clamp_origin(&mut self) {
        let (min, max) = self.origin_bounds();
        self.state.origin = self.state.origin.clamp(min, max);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.canvas = DVec2::new(width, height);
        self.clamp_origin();
    }

    /// Pointer position in un-zoomed content coordinates.
    pub fn to_content(&self, pointer: DVec2) -> DVec2 {
        (pointer - self.state.origin) / self.state.scale
    }

    /// Content coordinates to where they appear on the canvas.
    pub fn to_screen(&self, content: DVec2) -> DVec2 {
        self.state.origin + content * self.state.scale
    }

    /// Zoom about the cursor. `wheel_delta < 0` zooms in, `> 0` zooms out.
    ///
    /// Returns `false` if the cursor is off the canvas and nothing changed.
    pub fn apply_zoom(&mut self, cursor: DVec2, wheel_delta: f64) -> bool {
        if !self.contains(cursor) {
            tracing::trace!(x = cursor.x, y = cursor.y, "Zoom outside canvas ignored");
            return false;
        }

        let zoom = if wheel_delta < 0.0 {
            1.0 + self.zoom_step
        } else if wheel_delta > 0.0 {
            1.0 - self.zoom_step
        } else {
            1.0
        };

        let tentative = self.state.scale * zoom;
        if (MIN_SCALE..=MAX_SCALE).contains(&tentative) {
            self.state.scale = tentative;
            // Keep the content point under the cursor in place.
            let relative = (cursor - self.state.origin) / self.state.scale;
            self.state.origin -= relative * (zoom - 1.0) * self.state.scale;
        } else if tentative < MIN_SCALE {
            self.state.scale = MIN_SCALE;
            self.state.origin = DVec2::ZERO;
        } else {
            self.state.scale = MAX_SCALE;
        }

        self.clamp_origin();
        true
    }

    /// Start a drag-pan. Ignored off the canvas.
    pub fn begin_drag(&mut self, pointer: DVec2) -> bool {
        if !self.contains(pointer) {
            return false;
        }
        self.pan = Some(PanStart {
            pointer,
            origin: self.state.origin,
        });
        true
    }

    /// Continue a drag to a new pointer position. `false` if no drag is active.
    pub fn drag_to(&mut self, pointer: DVec2) -> bool {
        match self.pan {
            Some(start) => {
                self.apply_pan(pointer - start.pointer);
                true
            }
            None => false,
        }
    }

    /// Set the origin to the drag-start origin plus `delta`, clamped.
    ///
    /// Without an active drag the current origin is the start.
    pub fn apply_pan(&mut self, delta: DVec2) {
        let start = self.pan.map_or(self.state.origin, |p| p.origin);
        self.state.origin = start + delta;
        self.clamp_origin();
    }

    pub fn end_drag(&mut self) {
        self.pan = None;
    }

    pub fn reset(&mut self) {
        self.state = ViewportState::default();
        self.pan = None;
    }
}

fn within(pointer: DVec2, centre: DVec2, radius: f64) -> bool {
    pointer.distance(centre) <= radius
}

/// Index of the first candidate within `radius` of `pointer`.
///
/// `pointer` and `candidates` must be in the same space, normally content
/// coordinates (see [`Viewport2D::to_content`]).
pub fn hit_test(pointer: DVec2, candidates: &[DVec2], radius: f64) -> Option<usize> {
    hit_test_where(pointer, candidates, radius, |_| true)
}

/// Like [`hit_test`] but the most recently added candidate wins.
pub fn hit_test_last(pointer: DVec2, candidates: &[DVec2], radius: f64) -> Option<usize> {
    hit_test_last_where(pointer, candidates, radius, |_| true)
}

/// Last candidate within `radius` that also passes `eligible`.
pub fn hit_test_last_where(
    pointer: DVec2,
    candidates: &[DVec2],
    radius: f64,
    eligible: impl Fn(usize) -> bool,
) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .rev()
        .find(|&(i, &c)| within(pointer, c, radius) && eligible(i))
        .map(|(i, _)| i)
}

/// First candidate within `radius` that also passes `eligible`.
pub fn hit_test_where(
    pointer: DVec2,
    candidates: &[DVec2],
    radius: f64,
    eligible: impl Fn(usize) -> bool,
) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .find(|&(i, &c)| within(pointer, c, radius) && eligible(i))
        .map(|(i, _)| i)
}
