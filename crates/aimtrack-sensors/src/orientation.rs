use crate::types::Reference;
use crate::unwrap::{continuous, ClosedFormUnwrap, IncrementalUnwrap, Unwrap};
use glam::{DQuat, DVec3};

/// Half period of the yaw axis, in degrees.
pub const YAW_RANGE: f64 = 180.0;
/// Half period of the pitch axis. Pitch comes from `asin`, so its domain is ±90°.
pub const PITCH_RANGE: f64 = 90.0;
/// Half period of the roll axis, in degrees.
pub const ROLL_RANGE: f64 = 180.0;

/// Squared magnitude compared exactly, not within a tolerance.
const UNIT_MAGNITUDE_SQUARED: f64 = 1.0;
/// Added to `z` when the squared magnitude is exactly one.
const POSE_NUDGE: f64 = 1e-6;

/// Yaw/pitch/roll in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerAngles {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl EulerAngles {
    /// Z-Y-X extraction from a (not necessarily unit) quaternion.
    pub fn from_quat(q: DQuat) -> Self {
        let (w, x, y, z) = (q.w, q.x, q.y, q.z);
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
        let pitch = (2.0 * (w * x - y * z)).asin();
        let roll = (2.0 * (w * y + x * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        Self {
            yaw: yaw.to_degrees(),
            pitch: pitch.to_degrees(),
            roll: roll.to_degrees(),
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            yaw: self.yaw * factor,
            pitch: self.pitch * factor,
            roll: self.roll * factor,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

/// Turns a quaternion stream into continuous, sensitivity-scaled angles.
///
/// The unwrap strategy decides how revolutions are counted: the live view uses
/// [`IncrementalUnwrap`], session review uses [`ClosedFormUnwrap`].
#[derive(Debug, Clone, Default)]
pub struct OrientationResolver<U = IncrementalUnwrap> {
    yaw: U,
    pitch: U,
    roll: U,
}

/// Resolver for continuously sampled live data.
pub type LiveResolver = OrientationResolver<IncrementalUnwrap>;
/// Resolver for random-access playback.
pub type ReplayResolver = OrientationResolver<ClosedFormUnwrap>;

impl<U: Unwrap + Default> OrientationResolver<U> {
    pub fn new() -> Self {
        Self {
            yaw: U::default(),
            pitch: U::default(),
            roll: U::default(),
        }
    }

    /// Resolve one sample.
    ///
    /// With a reference, angles are taken from the component-wise difference
    /// `q - reference`. This is not the rotation relative to the reference, but
    /// it is what calibrated recordings were produced with and stays as is.
    pub fn resolve(
        &mut self,
        q: DQuat,
        reference: Option<&Reference>,
        sensitivity: f64,
    ) -> EulerAngles {
        let effective = match reference {
            Some(r) => r.apply(q),
            None => q,
        };

        let raw = EulerAngles::from_quat(effective).scaled(sensitivity);

        let yaw_factor = self.yaw.unwrap(raw.yaw, YAW_RANGE);
        let pitch_factor = self.pitch.unwrap(raw.pitch, PITCH_RANGE);
        let roll_factor = self.roll.unwrap(raw.roll, ROLL_RANGE);

        EulerAngles {
            yaw: continuous(raw.yaw, YAW_RANGE, yaw_factor),
            pitch: continuous(raw.pitch, PITCH_RANGE, pitch_factor),
            roll: continuous(raw.roll, ROLL_RANGE, roll_factor),
        }
    }

    /// Current revolution factors as `[yaw, pitch, roll]`.
    pub fn factors(&self) -> [i32; 3] {
        [self.yaw.factor(), self.pitch.factor(), self.roll.factor()]
    }

    pub fn reset(&mut self) {
        self.yaw.reset();
        self.pitch.reset();
        self.roll.reset();
    }
}

/// What [`normalize_for_pose`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseCorrection {
    None,
    /// Magnitude was above one and got scaled down.
    Rescaled,
    /// Magnitude was exactly one; `z` got nudged.
    Nudged,
}

/// Prepare a quaternion for axis-angle conversion.
///
/// Quaternions longer than one are scaled back to unit length. Shorter ones
/// are left alone (reference differences are routinely short). A squared
/// magnitude of exactly 1.0 gets `1e-6` added to `z`; the rifle view misbehaves
/// on that exact value and this nudge is the established workaround.
pub fn normalize_for_pose(q: DQuat) -> (DQuat, PoseCorrection) {
    let magnitude_squared = q.length_squared();

    if magnitude_squared > UNIT_MAGNITUDE_SQUARED {
        let inverse_magnitude = 1.0 / magnitude_squared.sqrt();
        return (q * inverse_magnitude, PoseCorrection::Rescaled);
    }

    if magnitude_squared == UNIT_MAGNITUDE_SQUARED {
        let nudged = DQuat::from_xyzw(q.x, q.y, q.z + POSE_NUDGE, q.w);
        return (nudged, PoseCorrection::Nudged);
    }

    (q, PoseCorrection::None)
}

/// Rifle pose as a display-space rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiflePose {
    /// Rotation angle in radians, already multiplied by the sensitivity.
    pub angle: f64,
    /// Rotation axis in display axes.
    pub axis: DVec3,
}

/// Axis-angle pose for the 3D rifle view.
///
/// The sensor frame maps onto display axes as `(-x, z, y)`.
pub fn rifle_pose(q: DQuat, reference: Option<&Reference>, sensitivity: f64) -> RiflePose {
    let effective = match reference {
        Some(r) => r.apply(q),
        None => q,
    };

    let (normalized, correction) = normalize_for_pose(effective);
    if correction == PoseCorrection::Nudged {
        tracing::trace!("Degenerate pose quaternion nudged");
    }

    let (axis, angle) = normalized.to_axis_angle();
    RiflePose {
        angle: angle * sensitivity,
        axis: DVec3::new(-axis.x, axis.z, axis.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn identity_has_zero_angles() {
        let mut resolver = LiveResolver::new();
        let angles = resolver.resolve(DQuat::IDENTITY, None, 1.0);
        assert!(close(angles.yaw, 0.0, 1e-9));
        assert!(close(angles.pitch, 0.0, 1e-9));
        assert!(close(angles.roll, 0.0, 1e-9));
    }

    #[test]
    fn quarter_turn_about_z_is_ninety_degrees_yaw() {
        let q = DQuat::from_xyzw(0.0, 0.0, 0.707, 0.707);
        let mut resolver = LiveResolver::new();
        let angles = resolver.resolve(q, None, 1.0);
        assert!(close(angles.yaw, 90.0, 0.05), "yaw={}", angles.yaw);
        assert!(close(angles.pitch, 0.0, 1e-9));
        assert!(close(angles.roll, 0.0, 1e-9));
    }

    #[test]
    fn sensitivity_scales_before_unwrapping() {
        // 90° yaw at sensitivity 3 is 270°, which unwraps to -90°.
        let q = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2);
        let mut live = LiveResolver::new();
        let angles = live.resolve(q, None, 3.0);
        assert!(close(angles.yaw, -90.0, 1e-5), "yaw={}", angles.yaw);
        assert_eq!(live.factors(), [1, 0, 0]);

        let mut replay = ReplayResolver::new();
        let angles = replay.resolve(q, None, 3.0);
        assert!(close(angles.yaw, -90.0, 1e-5));
    }

    #[test]
    fn reference_is_subtracted_component_wise() {
        let q = DQuat::from_xyzw(0.1, 0.2, 0.3, 0.9);
        let reference = Reference::capture(q);
        // At calibration the difference is the identity.
        let diff = reference.apply(q);
        assert!(close(diff.w, 1.0, 1e-12));
        assert!(close(diff.x, 0.0, 1e-12));
        assert!(close(diff.z, 0.0, 1e-12));

        let mut resolver = LiveResolver::new();
        let angles = resolver.resolve(q, Some(&reference), 5.0);
        assert!(close(angles.yaw, 0.0, 1e-9));
        assert!(close(angles.pitch, 0.0, 1e-9));
        assert!(close(angles.roll, 0.0, 1e-9));
    }

    #[test]
    fn zero_reference_leaves_quaternion_untouched() {
        let q = DQuat::from_xyzw(0.0, 0.0, 0.707, 0.707);
        let mut with_ref = LiveResolver::new();
        let mut without = LiveResolver::new();
        let a = with_ref.resolve(q, Some(&Reference::ZERO), 1.0);
        let b = without.resolve(q, None, 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn live_resolver_tracks_revolutions_across_frames() {
        // Sweep yaw from 0 to 170° at sensitivity 4: scaled yaw reaches 680°.
        let mut resolver = LiveResolver::new();
        let mut last = 0.0;
        for step in 0..=34 {
            let half = (step as f64 * 5.0).to_radians() / 2.0;
            let q = DQuat::from_xyzw(0.0, 0.0, half.sin(), half.cos());
            let angles = resolver.resolve(q, None, 4.0);
            assert!(angles.yaw > -180.0 - 1e-9 && angles.yaw <= 180.0 + 1e-9);
            last = angles.yaw;
        }
        assert_eq!(resolver.factors()[0], 2);
        assert!(close(last, 680.0 - 720.0, 1e-6), "yaw={last}");

        resolver.reset();
        assert_eq!(resolver.factors(), [0, 0, 0]);
    }

    #[test]
    fn replay_maps_straight_down_pitch_to_upper_bound() {
        let q = DQuat::from_xyzw(-0.5, 0.5, 0.5, 0.5);
        let mut replay = ReplayResolver::new();
        let angles = replay.resolve(q, None, 1.0);
        assert!(angles.pitch > -90.0, "pitch={}", angles.pitch);
        assert!(close(angles.pitch, 90.0, 1e-9), "pitch={}", angles.pitch);
        assert!(angles.yaw > -180.0 && angles.yaw <= 180.0);
        assert!(angles.roll > -180.0 && angles.roll <= 180.0);
    }

    #[test]
    fn pose_normalization_never_exceeds_unit_length() {
        let samples = [
            DQuat::from_xyzw(1.0, 1.0, 1.0, 1.0),
            DQuat::from_xyzw(0.5, 0.1, 0.0, 0.3),
            DQuat::from_xyzw(0.0, 0.0, 3.0, 0.0),
        ];
        for q in samples {
            let (n, _) = normalize_for_pose(q);
            assert!(n.length_squared() <= 1.0 + 1e-12);
        }

        let (n, correction) = normalize_for_pose(DQuat::from_xyzw(2.0, 0.0, 0.0, 0.0));
        assert_eq!(correction, PoseCorrection::Rescaled);
        assert!(close(n.x, 1.0, 1e-12));
    }

    #[test]
    fn exact_unit_magnitude_is_nudged_on_z() {
        let (n, correction) = normalize_for_pose(DQuat::IDENTITY);
        assert_eq!(correction, PoseCorrection::Nudged);
        assert_eq!(n.w, 1.0);
        assert_eq!(n.z, 1e-6);

        let (_, correction) = normalize_for_pose(DQuat::from_xyzw(0.0, 0.0, 0.5, 0.5));
        assert_eq!(correction, PoseCorrection::None);
    }

    #[test]
    fn rifle_pose_maps_axes_and_scales_angle() {
        let q = DQuat::from_rotation_x(0.5);
        let pose = rifle_pose(q, None, 2.0);
        assert!(close(pose.angle, 1.0, 1e-9), "angle={}", pose.angle);
        // The unit-length input picks up the z nudge, hence the loose tolerance.
        assert!(close(pose.axis.x, -1.0, 1e-6));
        assert!(close(pose.axis.y, 0.0, 1e-4));
        assert!(close(pose.axis.z, 0.0, 1e-9));
    }
}
