use aimtrack_sensors::types::{PositionCalibration, SensorFrame};
use glam::DVec2;
use std::collections::VecDeque;

/// Bounded history of calibrated board positions, oldest first.
///
/// Starts full of domain-origin points so the drawn trail always has the same
/// number of segments.
#[derive(Debug, Clone)]
pub struct PointTrail {
    points: VecDeque<DVec2>,
}

impl PointTrail {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: std::iter::repeat(DVec2::ZERO).take(capacity).collect(),
        }
    }

    /// Drop the oldest point and append `point`.
    pub fn push(&mut self, point: DVec2) {
        if self.points.pop_front().is_some() {
            self.points.push_back(point);
        }
    }

    pub fn latest(&self) -> Option<DVec2> {
        self.points.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = DVec2> + '_ {
        self.points.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A stable centre-of-gravity position and its shot number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotPoint {
    pub position: DVec2,
    pub label: i64,
}

/// Calibrated positions captured each time the board reports a stable
/// centre of gravity.
#[derive(Debug, Clone, Default)]
pub struct ShotPoints {
    points: Vec<DVec2>,
    last_cog: u64,
}

impl ShotPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the frame's position if its centre-of-gravity counter moved.
    ///
    /// Several stable samples between two calls still add one point, at the
    /// latest position.
    pub fn observe(&mut self, frame: &SensorFrame, calibration: &PositionCalibration) -> bool {
        if frame.cog_count == self.last_cog {
            return false;
        }
        self.last_cog = frame.cog_count;
        self.points.push(calibration.apply(frame.position));
        tracing::debug!(
            count = self.points.len(),
            shot_id = frame.shot_id,
            "Centre of gravity captured"
        );
        true
    }

    /// Empty the list. Counter tracking is kept so no old sample comes back.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Points with their shot labels, the newest labelled `shot_id - 1`.
    pub fn labelled(&self, shot_id: i64) -> impl Iterator<Item = ShotPoint> + '_ {
        let len = self.points.len() as i64;
        self.points
            .iter()
            .enumerate()
            .map(move |(i, &position)| ShotPoint {
                position,
                label: shot_id - len + i as i64,
            })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_keeps_capacity_and_order() {
        let mut trail = PointTrail::new(300);
        assert_eq!(trail.len(), 300);
        assert!(trail.iter().all(|p| p == DVec2::ZERO));

        for i in 0..310 {
            trail.push(DVec2::new(i as f64, 0.0));
        }
        assert_eq!(trail.len(), 300);
        assert_eq!(trail.iter().next(), Some(DVec2::new(10.0, 0.0)));
        assert_eq!(trail.latest(), Some(DVec2::new(309.0, 0.0)));
    }

    #[test]
    fn empty_trail_stays_empty() {
        let mut trail = PointTrail::new(0);
        trail.push(DVec2::ONE);
        assert!(trail.is_empty());
        assert_eq!(trail.latest(), None);
    }

    #[test]
    fn shots_follow_the_cog_counter() {
        let calibration = PositionCalibration::capture(DVec2::new(0.1, 0.0));
        let mut shots = ShotPoints::new();
        let mut frame = SensorFrame {
            position: DVec2::new(0.3, 0.2),
            shot_id: 4,
            ..SensorFrame::default()
        };

        assert!(!shots.observe(&frame, &calibration));
        frame.cog_count = 1;
        assert!(shots.observe(&frame, &calibration));
        assert!(!shots.observe(&frame, &calibration));
        frame.cog_count = 3;
        assert!(shots.observe(&frame, &calibration));

        let points: Vec<ShotPoint> = shots.labelled(frame.shot_id).collect();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].label, 2);
        assert_eq!(points[1].label, 3);
        assert!((points[0].position.x - 0.2).abs() < 1e-12);
    }

    #[test]
    fn clear_does_not_replay_old_samples() {
        let mut shots = ShotPoints::new();
        let frame = SensorFrame {
            cog_count: 5,
            ..SensorFrame::default()
        };
        shots.observe(&frame, &PositionCalibration::default());
        shots.clear();
        assert!(shots.is_empty());
        assert!(!shots.observe(&frame, &PositionCalibration::default()));
    }
}
