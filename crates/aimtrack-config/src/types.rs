use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Orientation indicators and stability.
    pub orientation: OrientationConfig,
    /// Balance board plots.
    pub board: BoardConfig,
    /// Pan/zoom canvas behaviour.
    pub view: ViewConfig,
    /// Data feed connection.
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrientationConfig {
    /// Angle multiplier applied before unwrapping. Higher = small rifle movements read larger.
    pub sensitivity: f64,
    /// Slider bounds for `sensitivity`.
    pub sensitivity_range: SliderRange,
    /// Multiplier for the stability (jitter) metric.
    pub stability_sensitivity: f64,
    /// Slider bounds for `stability_sensitivity`.
    pub stability_sensitivity_range: SliderRange,
    /// Number of slots in the stability history.
    pub stability_history: usize,
    /// Period of the live stability update.
    pub stability_interval_ms: u64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            sensitivity_range: SliderRange { min: 1.0, max: 20.0 },
            stability_sensitivity: 10.0,
            stability_sensitivity_range: SliderRange {
                min: 10.0,
                max: 100.0,
            },
            stability_history: 60,
            stability_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
}

impl SliderRange {
    /// Finite bounds with `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Clamp a user supplied value into the slider bounds.
    ///
    /// An invalid range returns the value unchanged. A NaN value maps to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if !self.is_valid() {
            return value;
        }
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Number of positions kept in the live centre-of-gravity trail.
    pub trail_length: usize,
    /// Grid square size in pixels.
    pub square_size: f64,
    /// Slider bounds for `square_size`.
    pub square_size_range: SliderRange,
    /// Plot region of the live board canvas.
    pub live_plot: PlotLayout,
    /// Plot region of the session review canvas.
    pub review_plot: PlotLayout,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            trail_length: 300,
            square_size: 20.0,
            square_size_range: SliderRange {
                min: 10.0,
                max: 50.0,
            },
            live_plot: PlotLayout::live(),
            review_plot: PlotLayout::review(),
        }
    }
}

/// Plot rectangle expressed as fractions of the canvas size.
///
/// The rectangle is `width_fraction * w` wide and `height_fraction * h` tall,
/// centred horizontally and pushed down by `top_fraction` of the leftover height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotLayout {
    pub width_fraction: f64,
    pub height_fraction: f64,
    pub top_fraction: f64,
}

impl PlotLayout {
    pub fn live() -> Self {
        Self {
            width_fraction: 0.98,
            height_fraction: 0.85,
            top_fraction: 0.1,
        }
    }

    pub fn review() -> Self {
        Self {
            width_fraction: 0.98,
            height_fraction: 0.9,
            top_fraction: 0.7,
        }
    }

    /// Resolve to `(x, y, w, h)` for a canvas of the given size.
    pub fn resolve(&self, canvas_width: f64, canvas_height: f64) -> (f64, f64, f64, f64) {
        let w = self.width_fraction * canvas_width;
        let h = self.height_fraction * canvas_height;
        let x = (canvas_width - w) / 2.0;
        let y = (canvas_height - h) * self.top_fraction;
        (x, y, w, h)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Canvas size in pixels.
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Relative scale change per wheel notch.
    pub zoom_step: f64,
    /// Pointer hit radius for point selection, in pixels.
    pub hit_radius: f64,
    /// Render cadence of the live frame loop.
    pub frame_rate_hz: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            canvas_width: 960.0,
            canvas_height: 490.0,
            zoom_step: 0.02,
            hit_radius: 15.0,
            frame_rate_hz: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// `host:port` of the sensor bridge.
    pub address: String,
    /// Period of the outbound control-parameter message.
    pub send_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8765".to_string(),
            send_interval_ms: 1000,
        }
    }
}
