use aimtrack_sensors::orientation::{EulerAngles, PITCH_RANGE, ROLL_RANGE, YAW_RANGE};

/// Fraction of the canvas width covered by each half of a bar.
const HALF_LENGTH_FRACTION: f64 = 0.4;
/// Vertical distance of the outer bars from the canvas centre, as a fraction of its height.
const BAR_SPACING_FRACTION: f64 = 0.25;
/// Bar length divided by the tick half-height.
const TICK_DIVISOR: f64 = 25.0;

/// One horizontal indicator bar, in canvas-centred coordinates (`+y` down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorBar {
    pub y: f64,
    pub half_length: f64,
    /// Half-height of the reference tick and of the moving marker.
    pub tick_half_height: f64,
    /// Angle that puts the marker at the end of the bar.
    pub full_scale: f64,
}

impl IndicatorBar {
    fn new(y: f64, half_length: f64, full_scale: f64) -> Self {
        Self {
            y,
            half_length,
            tick_half_height: 2.0 * half_length / TICK_DIVISOR,
            full_scale,
        }
    }

    /// Horizontal marker offset from the bar centre for `angle` degrees.
    ///
    /// Not clamped: a continuous angle past full scale runs off the bar.
    pub fn offset(&self, angle: f64) -> f64 {
        angle * self.half_length / self.full_scale
    }
}

/// Marker offsets for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorMarkers {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Geometry of the three orientation bars.
///
/// Yaw sits above the centre, roll on it and pitch below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorLayout {
    pub yaw: IndicatorBar,
    pub roll: IndicatorBar,
    pub pitch: IndicatorBar,
}

impl IndicatorLayout {
    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        let half_length = canvas_width * HALF_LENGTH_FRACTION;
        let spacing = canvas_height * BAR_SPACING_FRACTION;
        Self {
            yaw: IndicatorBar::new(-spacing, half_length, YAW_RANGE),
            roll: IndicatorBar::new(0.0, half_length, ROLL_RANGE),
            pitch: IndicatorBar::new(spacing, half_length, PITCH_RANGE),
        }
    }

    pub fn markers(&self, angles: &EulerAngles) -> IndicatorMarkers {
        IndicatorMarkers {
            yaw: self.yaw.offset(angles.yaw),
            pitch: self.pitch.offset(angles.pitch),
            roll: self.roll.offset(angles.roll),
        }
    }
}
