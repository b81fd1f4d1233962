use aimtrack_input::mouse::Target;
use aimtrack_input::viewport::{hit_test_last, hit_test_where, PlotRect};
use glam::{DQuat, DVec2};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Samples before the shot moment that start the approach phase.
const APPROACH_SAMPLES: f64 = 200.0;
/// Samples before the shot moment that start the final phase.
const FINAL_SAMPLES: f64 = 25.0;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session field {field} has {found} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Session has no orientation samples")]
    Empty,
    #[error("Failed to read session: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse session: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Board trace around one shot, as stored by the recorder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TailRecord {
    #[serde(rename = "X_tail")]
    pub x: Vec<f64>,
    #[serde(rename = "Y_tail")]
    pub y: Vec<f64>,
}

/// A recorded shot, loaded for review.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRecord {
    pub q0: Vec<f64>,
    pub q1: Vec<f64>,
    pub q2: Vec<f64>,
    pub q3: Vec<f64>,
    /// Every stable centre-of-gravity point of the session, oldest first.
    #[serde(rename = "X_total_points", default)]
    pub total_x: Vec<f64>,
    #[serde(rename = "Y_total_points", default)]
    pub total_y: Vec<f64>,
    /// Board trace of the reviewed shot.
    #[serde(rename = "X_tab", default)]
    pub tail_x: Vec<f64>,
    #[serde(rename = "Y_tab", default)]
    pub tail_y: Vec<f64>,
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<i64>,
    #[serde(rename = "shotID", default = "no_shot")]
    pub shot_id: i64,
    /// Traces of the other shots, parallel to the total points, when exported.
    #[serde(default)]
    pub tails: Vec<TailRecord>,
}

fn no_shot() -> i64 {
    -1
}

fn check_len(field: &'static str, expected: usize, found: usize) -> Result<(), SessionError> {
    if expected == found {
        Ok(())
    } else {
        Err(SessionError::LengthMismatch {
            field,
            expected,
            found,
        })
    }
}

impl SessionRecord {
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let contents = std::fs::read_to_string(path)?;
        let record = Self::from_json(&contents)?;
        tracing::info!(
            path = %path.display(),
            samples = record.len(),
            points = record.total_x.len(),
            shot_id = record.shot_id,
            "Session loaded"
        );
        Ok(record)
    }

    pub fn from_json(text: &str) -> Result<Self, SessionError> {
        let record: Self = serde_json::from_str(text)?;
        record.validate()?;
        Ok(record)
    }

    fn validate(&self) -> Result<(), SessionError> {
        let n = self.q0.len();
        if n == 0 {
            return Err(SessionError::Empty);
        }
        check_len("q1", n, self.q1.len())?;
        check_len("q2", n, self.q2.len())?;
        check_len("q3", n, self.q3.len())?;
        check_len("Y_total_points", self.total_x.len(), self.total_y.len())?;
        check_len("Y_tab", self.tail_x.len(), self.tail_y.len())?;
        if !self.tails.is_empty() {
            check_len("tails", self.total_x.len(), self.tails.len())?;
        }
        for tail in &self.tails {
            check_len("Y_tail", tail.x.len(), tail.y.len())?;
        }
        Ok(())
    }

    /// Number of playback samples.
    pub fn len(&self) -> usize {
        self.q0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q0.is_empty()
    }

    pub fn quaternion(&self, index: usize) -> Option<DQuat> {
        Some(DQuat::from_xyzw(
            *self.q1.get(index)?,
            *self.q2.get(index)?,
            *self.q3.get(index)?,
            *self.q0.get(index)?,
        ))
    }

    pub fn quaternions(&self) -> Vec<DQuat> {
        (0..self.len()).filter_map(|i| self.quaternion(i)).collect()
    }

    pub fn total_points(&self) -> Vec<DVec2> {
        zip_points(&self.total_x, &self.total_y)
    }

    pub fn shot_tail(&self) -> ShotTail {
        ShotTail::new(zip_points(&self.tail_x, &self.tail_y))
    }

    /// Stored trace of the total point at `index`, if the export carries one.
    pub fn tail_for(&self, index: usize) -> Option<ShotTail> {
        self.tails
            .get(index)
            .map(|t| ShotTail::new(zip_points(&t.x, &t.y)))
    }
}

fn zip_points(x: &[f64], y: &[f64]) -> Vec<DVec2> {
    x.iter().zip(y).map(|(&x, &y)| DVec2::new(x, y)).collect()
}

/// Index of the shot moment in a centred recording of `len` samples.
pub fn shot_moment(len: usize) -> usize {
    (len / 2).saturating_sub(1)
}

/// Random-access playback over a recording.
#[derive(Debug, Clone)]
pub struct Playback {
    len: usize,
    index: usize,
    playing: bool,
    started: bool,
}

impl Playback {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            index: 0,
            playing: false,
            started: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        self.playing = !self.playing;
    }

    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.len.saturating_sub(1));
    }

    pub fn jump_to_shot(&mut self) {
        self.index = shot_moment(self.len);
    }

    /// Advance one sample while playing, wrapping at the end.
    ///
    /// The first tick after the first `play` rewinds to the start.
    pub fn tick(&mut self) -> usize {
        if self.playing && self.len > 0 {
            if self.started {
                self.index = (self.index + 1) % self.len;
            } else {
                self.index = 0;
                self.started = true;
            }
        }
        self.index
    }
}

/// Colour band of a trace sample relative to the shot moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailPhase {
    /// More than 200 samples before the shot.
    Early,
    /// From 200 down to 25 samples before the shot.
    Approach,
    /// The last samples up to the shot moment.
    Final,
    FollowThrough,
}

/// Board trace centred on a shot, in domain coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotTail {
    points: Vec<DVec2>,
}

impl ShotTail {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Position at the shot moment.
    pub fn marker(&self) -> Option<DVec2> {
        if self.points.is_empty() {
            return None;
        }
        self.points.get(shot_moment(self.points.len())).copied()
    }

    pub fn phase(&self, index: usize) -> TailPhase {
        let half = self.points.len() as f64 / 2.0;
        let i = index as f64;
        if i < half - APPROACH_SAMPLES {
            TailPhase::Early
        } else if i <= half - FINAL_SAMPLES {
            TailPhase::Approach
        } else if i <= half - 1.0 {
            TailPhase::Final
        } else {
            TailPhase::FollowThrough
        }
    }

    /// Line segments `(from, to, phase)` in screen space, phase of the start point.
    pub fn segments<'a>(
        &'a self,
        rect: &'a PlotRect,
    ) -> impl Iterator<Item = (DVec2, DVec2, TailPhase)> + 'a {
        self.points.windows(2).enumerate().map(move |(i, pair)| {
            (
                rect.domain_to_screen(pair[0]),
                rect.domain_to_screen(pair[1]),
                self.phase(i),
            )
        })
    }
}

/// A shot added to the comparison view.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparedShot {
    /// Display number of the shot.
    pub number: usize,
    pub tail: ShotTail,
}

/// Session review: the point overview and the set of shots compared against
/// the reviewed one.
///
/// Points are numbered from the newest: the last recorded point is 1.
#[derive(Debug, Clone)]
pub struct SessionReview {
    rect: PlotRect,
    points: Vec<DVec2>,
    screen: Vec<DVec2>,
    shot_id: i64,
    reviewed: ShotTail,
    compared: Vec<ComparedShot>,
    hit_radius: f64,
}

impl SessionReview {
    pub fn new(record: &SessionRecord, rect: PlotRect, hit_radius: f64) -> Self {
        let points = record.total_points();
        let screen = points.iter().map(|&p| rect.domain_to_screen(p)).collect();
        Self {
            rect,
            points,
            screen,
            shot_id: record.shot_id,
            reviewed: record.shot_tail(),
            compared: Vec::new(),
            hit_radius,
        }
    }

    pub fn rect(&self) -> &PlotRect {
        &self.rect
    }

    pub fn resize(&mut self, rect: PlotRect) {
        self.rect = rect;
        self.screen = self.points.iter().map(|&p| rect.domain_to_screen(p)).collect();
    }

    pub fn reviewed(&self) -> &ShotTail {
        &self.reviewed
    }

    pub fn compared(&self) -> &[ComparedShot] {
        &self.compared
    }

    /// Point positions in content pixels.
    pub fn point_positions(&self) -> &[DVec2] {
        &self.screen
    }

    /// Shot number shown for point `index`, counting back from the newest.
    pub fn display_number(&self, index: usize) -> Option<usize> {
        self.points.len().checked_sub(index).filter(|&n| n > 0)
    }

    pub fn is_compared(&self, number: usize) -> bool {
        self.compared.iter().any(|c| c.number == number)
    }

    /// A point can be picked unless it is already compared or is the reviewed shot.
    pub fn is_eligible(&self, index: usize) -> bool {
        let Some(number) = self.display_number(index) else {
            return false;
        };
        !self.is_compared(number) && number as i64 != self.shot_id
    }

    /// Overview points as pointer targets.
    pub fn point_targets(&self) -> Vec<Target> {
        self.screen
            .iter()
            .enumerate()
            .map(|(i, &position)| Target {
                position,
                selectable: self.is_eligible(i),
            })
            .collect()
    }

    /// Compared shot markers as pointer targets, in insertion order.
    pub fn comparison_targets(&self) -> Vec<Target> {
        self.comparison_markers().into_iter().map(Target::new).collect()
    }

    fn comparison_markers(&self) -> Vec<DVec2> {
        self.compared
            .iter()
            .map(|c| {
                c.tail
                    .marker()
                    .map_or(self.rect.centre(), |m| self.rect.domain_to_screen(m))
            })
            .collect()
    }

    /// First eligible overview point under `pointer` (content pixels).
    pub fn point_at(&self, pointer: DVec2) -> Option<usize> {
        hit_test_where(pointer, &self.screen, self.hit_radius, |i| self.is_eligible(i))
    }

    /// Point index for a typed shot number, if it may be compared.
    pub fn index_for_number(&self, number: usize) -> Option<usize> {
        let len = self.points.len();
        if number == 0 || number > len || number as i64 == self.shot_id || self.is_compared(number) {
            return None;
        }
        Some(len - number)
    }

    /// Add the trace of point `index` to the comparison. `false` if not eligible.
    pub fn compare(&mut self, index: usize, tail: ShotTail) -> bool {
        if !self.is_eligible(index) {
            return false;
        }
        let Some(number) = self.display_number(index) else {
            return false;
        };
        tracing::debug!(number, samples = tail.len(), "Shot added to comparison");
        self.compared.push(ComparedShot { number, tail });
        true
    }

    /// Most recently added compared shot whose marker is under `pointer`.
    pub fn comparison_at(&self, pointer: DVec2) -> Option<usize> {
        hit_test_last(pointer, &self.comparison_markers(), self.hit_radius)
    }

    /// Remove the compared shot under `pointer` and return its number.
    pub fn remove_at(&mut self, pointer: DVec2) -> Option<usize> {
        let position = self.comparison_at(pointer)?;
        let removed = self.compared.remove(position);
        tracing::debug!(number = removed.number, "Shot removed from comparison");
        Some(removed.number)
    }
}
