use glam::DQuat;
use std::collections::VecDeque;

/// Jitter between two consecutive orientation samples.
///
/// Euclidean distance of the raw components, scaled by the user sensitivity.
pub fn jitter(previous: DQuat, current: DQuat, sensitivity: f64) -> f64 {
    (current - previous).length() * sensitivity
}

/// Fixed-length stability history for the live chart. Newest value first.
#[derive(Debug, Clone)]
pub struct StabilityHistory {
    values: VecDeque<f64>,
    previous: Option<DQuat>,
}

impl StabilityHistory {
    pub fn new(slots: usize) -> Self {
        Self {
            values: std::iter::repeat(0.0).take(slots).collect(),
            previous: None,
        }
    }

    /// Record the jitter since the last call and return it.
    ///
    /// The first sample has nothing to compare against and records zero.
    pub fn push(&mut self, q: DQuat, sensitivity: f64) -> f64 {
        let value = match self.previous {
            Some(previous) => jitter(previous, q, sensitivity),
            None => 0.0,
        };
        self.previous = Some(q);

        if self.values.pop_back().is_some() {
            self.values.push_front(value);
        }
        value
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Stability profile of a recorded session.
///
/// Splits the sample-to-sample jitter into `buckets` consecutive groups of
/// `samples.len() / buckets` steps and sums each group. Samples past the last
/// full group are ignored.
pub fn session_profile(samples: &[DQuat], buckets: usize, sensitivity: f64) -> Vec<f64> {
    if buckets == 0 {
        return Vec::new();
    }
    let per_bucket = samples.len() / buckets;

    (0..buckets)
        .map(|bucket| {
            (0..per_bucket)
                .map(|j| bucket * per_bucket + j)
                .filter(|&i| i + 1 < samples.len())
                .map(|i| jitter(samples[i], samples[i + 1], sensitivity))
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_orientation_has_zero_jitter() {
        let q = DQuat::from_rotation_y(0.3);
        assert_eq!(jitter(q, q, 50.0), 0.0);
    }

    #[test]
    fn history_is_newest_first_and_bounded() {
        let mut history = StabilityHistory::new(60);
        assert_eq!(history.push(DQuat::IDENTITY, 10.0), 0.0);

        let moved = DQuat::from_xyzw(0.1, 0.0, 0.0, 1.0);
        let value = history.push(moved, 10.0);
        assert!((value - 1.0).abs() < 1e-12);

        let values: Vec<f64> = history.values().collect();
        assert_eq!(values.len(), 60);
        assert!((values[0] - 1.0).abs() < 1e-12);
        assert_eq!(values[1], 0.0);
    }

    #[test]
    fn session_profile_sums_each_bucket() {
        // Alternate between two orientations: every step has the same jitter.
        let a = DQuat::IDENTITY;
        let b = DQuat::from_xyzw(0.0, 0.2, 0.0, 1.0);
        let samples: Vec<DQuat> = (0..120).map(|i| if i % 2 == 0 { a } else { b }).collect();

        let profile = session_profile(&samples, 60, 1.0);
        assert_eq!(profile.len(), 60);
        // Two steps per bucket, each 0.2; the final bucket loses its last step.
        assert!((profile[0] - 0.4).abs() < 1e-12);
        assert!((profile[58] - 0.4).abs() < 1e-12);
        assert!((profile[59] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn short_session_gives_empty_buckets() {
        let samples = vec![DQuat::IDENTITY; 10];
        let profile = session_profile(&samples, 60, 1.0);
        assert_eq!(profile.len(), 60);
        assert!(profile.iter().all(|&v| v == 0.0));
    }
}
