pub mod grid;
pub mod indicator;
pub mod session;
pub mod trail;

use aimtrack_input::mouse::InteractionManager;
use aimtrack_input::viewport::{PlotRect, ViewportState};
use aimtrack_sensors::orientation::{rifle_pose, EulerAngles, LiveResolver, RiflePose};
use aimtrack_sensors::protocol::ControlParameters;
use aimtrack_sensors::stability::StabilityHistory;
use aimtrack_sensors::types::{PositionCalibration, Reference, SensorFrame};
use glam::DVec2;
use indicator::{IndicatorLayout, IndicatorMarkers};
use trail::{PointTrail, ShotPoint, ShotPoints};

/// Everything the renderer needs for one live frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub angles: EulerAngles,
    pub indicators: IndicatorMarkers,
    pub pose: RiflePose,
    /// Live trail in content pixels, oldest first.
    pub trail: Vec<DVec2>,
    /// Shot points in content pixels.
    pub shots: Vec<ShotPoint>,
    pub viewport: ViewportState,
    pub hovered: Option<usize>,
    /// Stability history, newest first.
    pub stability: Vec<f64>,
    pub session_id: Option<i64>,
    pub shot_id: i64,
}

/// Live view settings.
#[derive(Debug, Clone, Copy)]
pub struct LiveSettings {
    pub sensitivity: f64,
    pub stability_sensitivity: f64,
    pub trail_length: usize,
    pub stability_slots: usize,
    /// Size of the orientation indicator canvas.
    pub indicator_canvas: DVec2,
    /// Plotting region of the board canvas.
    pub plot: PlotRect,
}

/// Live session state driven by feed snapshots.
pub struct LiveScene {
    settings: LiveSettings,
    resolver: LiveResolver,
    indicators: IndicatorLayout,
    trail: PointTrail,
    shots: ShotPoints,
    stability: StabilityHistory,
    reference: Option<Reference>,
    calibration: PositionCalibration,
    last: SensorFrame,
}

impl LiveScene {
    pub fn new(settings: LiveSettings) -> Self {
        Self {
            resolver: LiveResolver::new(),
            indicators: IndicatorLayout::new(settings.indicator_canvas.x, settings.indicator_canvas.y),
            trail: PointTrail::new(settings.trail_length),
            shots: ShotPoints::new(),
            stability: StabilityHistory::new(settings.stability_slots),
            reference: None,
            calibration: PositionCalibration::default(),
            last: SensorFrame::default(),
            settings,
        }
    }

    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.settings.sensitivity = sensitivity;
    }

    pub fn set_stability_sensitivity(&mut self, sensitivity: f64) {
        self.settings.stability_sensitivity = sensitivity;
    }

    pub fn resize_indicators(&mut self, width: f64, height: f64) {
        self.settings.indicator_canvas = DVec2::new(width, height);
        self.indicators = IndicatorLayout::new(width, height);
    }

    pub fn set_plot(&mut self, plot: PlotRect) {
        self.settings.plot = plot;
    }

    /// Take the latest orientation as the new zero.
    pub fn calibrate_orientation(&mut self) {
        self.reference = Some(Reference::capture(self.last.quaternion));
        self.resolver.reset();
        tracing::info!(shot_id = self.last.shot_id, "Orientation calibrated");
    }

    /// Take the latest board position as the new centre.
    pub fn calibrate_position(&mut self) {
        self.calibration = PositionCalibration::capture(self.last.position);
        tracing::info!(
            x = self.calibration.offset.x,
            y = self.calibration.offset.y,
            "Board position calibrated"
        );
    }

    pub fn clear_shots(&mut self) {
        self.shots.clear();
    }

    /// Settings to send back to the bridge.
    pub fn parameters(&self) -> ControlParameters {
        ControlParameters::new(
            &self.reference.unwrap_or(Reference::ZERO),
            self.settings.sensitivity,
            self.settings.stability_sensitivity,
            &self.calibration,
        )
    }

    /// Push the jitter since the previous sample into the stability history.
    pub fn sample_stability(&mut self) -> f64 {
        self.stability
            .push(self.last.quaternion, self.settings.stability_sensitivity)
    }

    /// Fold in a feed snapshot and build the frame for it.
    pub fn update(&mut self, frame: SensorFrame, view: &InteractionManager) -> Frame {
        self.last = frame;

        let angles = self.resolver.resolve(
            frame.quaternion,
            self.reference.as_ref(),
            self.settings.sensitivity,
        );
        if !angles.is_finite() {
            tracing::trace!(?angles, "Non-finite orientation");
        }

        let point = self.calibration.apply(frame.position);
        self.trail.push(point);
        self.shots.observe(&frame, &self.calibration);

        let plot = self.settings.plot;
        Frame {
            angles,
            indicators: self.indicators.markers(&angles),
            pose: rifle_pose(frame.quaternion, self.reference.as_ref(), self.settings.sensitivity),
            trail: self.trail.iter().map(|p| plot.domain_to_screen(p)).collect(),
            shots: self
                .shots
                .labelled(frame.shot_id)
                .map(|s| ShotPoint {
                    position: plot.domain_to_screen(s.position),
                    label: s.label,
                })
                .collect(),
            viewport: view.viewport().state(),
            hovered: view.hovered,
            stability: self.stability.values().collect(),
            session_id: frame.session_id,
            shot_id: frame.shot_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimtrack_input::viewport::Viewport2D;
    use glam::DQuat;

    fn scene() -> LiveScene {
        LiveScene::new(LiveSettings {
            sensitivity: 1.0,
            stability_sensitivity: 10.0,
            trail_length: 5,
            stability_slots: 60,
            indicator_canvas: DVec2::new(400.0, 200.0),
            plot: PlotRect::new(0.0, 0.0, 200.0, 100.0),
        })
    }

    fn view() -> InteractionManager {
        InteractionManager::new(Viewport2D::new(200.0, 100.0))
    }

    #[test]
    fn calibration_zeroes_the_current_pose() {
        let mut scene = scene();
        let view = view();
        let q = DQuat::from_rotation_z(0.4);
        let before = scene.update(SensorFrame { quaternion: q, ..SensorFrame::default() }, &view);
        assert!(before.angles.yaw.abs() > 1.0);

        scene.calibrate_orientation();
        let after = scene.update(SensorFrame { quaternion: q, ..SensorFrame::default() }, &view);
        assert!(after.angles.yaw.abs() < 1e-9);
        assert!(after.indicators.yaw.abs() < 1e-9);
    }

    #[test]
    fn trail_and_shots_are_in_plot_pixels() {
        let mut scene = scene();
        let view = view();
        let frame = SensorFrame {
            position: DVec2::new(0.5, 0.5),
            cog_count: 1,
            shot_id: 3,
            ..SensorFrame::default()
        };
        let out = scene.update(frame, &view);
        assert_eq!(out.trail.len(), 5);
        assert_eq!(out.trail[4], DVec2::new(150.0, 25.0));
        assert_eq!(out.trail[0], DVec2::new(100.0, 50.0));
        assert_eq!(out.shots.len(), 1);
        assert_eq!(out.shots[0].label, 2);
        assert_eq!(out.shots[0].position, DVec2::new(150.0, 25.0));

        scene.calibrate_position();
        let recentred = scene.update(frame, &view);
        assert_eq!(recentred.trail[4], DVec2::new(100.0, 50.0));
    }

    #[test]
    fn parameters_carry_calibration() {
        let mut scene = scene();
        let view = view();
        scene.update(
            SensorFrame {
                quaternion: DQuat::from_xyzw(0.1, 0.0, 0.0, 0.9),
                position: DVec2::new(0.2, 0.1),
                ..SensorFrame::default()
            },
            &view,
        );
        assert_eq!(scene.parameters().q0_ref, 0.0);

        scene.calibrate_orientation();
        scene.calibrate_position();
        scene.set_sensitivity(4.0);
        let params = scene.parameters();
        assert!((params.q0_ref + 0.1).abs() < 1e-12);
        assert_eq!(params.q1_ref, 0.1);
        assert_eq!(params.x_calibration, 0.2);
        assert_eq!(params.sensitivity, 4.0);
    }

    #[test]
    fn stability_samples_latest_frame() {
        let mut scene = scene();
        let view = view();
        assert_eq!(scene.sample_stability(), 0.0);
        scene.update(
            SensorFrame {
                quaternion: DQuat::from_xyzw(0.0, 0.0, 0.1, 1.0),
                ..SensorFrame::default()
            },
            &view,
        );
        assert!((scene.sample_stability() - 1.0).abs() < 1e-12);
    }
}
