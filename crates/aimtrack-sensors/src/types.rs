use glam::{DQuat, DVec2};

/// Latest state published by the data feed.
///
/// Read once per frame as a copy, so every field comes from the same message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    /// Rifle orientation straight from the sensor.
    pub quaternion: DQuat,
    /// Balance board centre of gravity, normalized to roughly `[-1, 1]`.
    pub position: DVec2,
    /// Number of stable centre-of-gravity samples seen so far.
    ///
    /// Consumers compare it with the value they last handled.
    pub cog_count: u64,
    pub session_id: Option<i64>,
    /// Current shot number, `-1` before the first shot.
    pub shot_id: i64,
}

impl Default for SensorFrame {
    fn default() -> Self {
        Self {
            quaternion: DQuat::IDENTITY,
            position: DVec2::ZERO,
            cog_count: 0,
            session_id: None,
            shot_id: -1,
        }
    }
}

/// One decoded feed message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSample {
    pub quaternion: DQuat,
    pub position: DVec2,
    /// A new stable centre-of-gravity sample is ready.
    pub cog: bool,
    pub session_id: Option<i64>,
    pub shot_id: i64,
}

impl SensorFrame {
    /// Fold a feed message into the snapshot.
    pub fn apply(&mut self, sample: &FeedSample) {
        self.quaternion = sample.quaternion;
        self.position = sample.position;
        self.session_id = sample.session_id;
        self.shot_id = sample.shot_id;
        if sample.cog {
            self.cog_count += 1;
        }
    }
}

/// Orientation reference captured at calibration.
///
/// Stored as raw components because it is subtracted component-wise, not
/// composed as a rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reference {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Reference {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Reference {
    /// No calibration: subtracting it leaves the quaternion unchanged.
    pub const ZERO: Self = Self {
        w: 0.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Calibrate on the current orientation.
    ///
    /// `w` is stored minus one so that `apply` on the captured quaternion
    /// yields the identity.
    pub fn capture(q: DQuat) -> Self {
        Self {
            w: q.w - 1.0,
            x: q.x,
            y: q.y,
            z: q.z,
        }
    }

    pub fn from_components(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Component-wise `q - self`.
    pub fn apply(&self, q: DQuat) -> DQuat {
        q - DQuat::from_xyzw(self.x, self.y, self.z, self.w)
    }
}

/// Board position captured at calibration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionCalibration {
    pub offset: DVec2,
}

impl PositionCalibration {
    pub fn capture(position: DVec2) -> Self {
        Self { offset: position }
    }

    /// Calibration-relative domain point.
    pub fn apply(&self, position: DVec2) -> DVec2 {
        position - self.offset
    }
}
