//! Revolution counting for angles that leave their principal range.
//!
//! Euler extraction only ever yields angles in `[-range, range]`, but once the
//! sensitivity multiplier is applied the scaled angle can sweep through several
//! periods. An unwrapper tracks an integer factor so that
//! `theta - factor * 2 * range` stays near the principal range.
//!
//! [`IncrementalUnwrap`] follows a continuously sampled stream one step at a
//! time. [`ClosedFormUnwrap`] answers for any single sample with no history.

/// A per-axis revolution counter.
pub trait Unwrap {
    /// Feed a raw (scaled) angle in degrees and return the updated factor.
    ///
    /// `range` is the half period: 180 for yaw and roll, 90 for pitch.
    fn unwrap(&mut self, theta: f64, range: f64) -> i32;

    /// Factor returned by the most recent call.
    fn factor(&self) -> i32;

    /// Forget any accumulated state.
    fn reset(&mut self);
}

/// Continuous angle for a raw angle and its revolution factor.
pub fn continuous(theta: f64, range: f64, factor: i32) -> f64 {
    theta - factor as f64 * 2.0 * range
}

/// Stateful hysteresis counter for live streams.
///
/// The factor moves by at most one per call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncrementalUnwrap {
    fact: i32,
}

impl IncrementalUnwrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known factor, e.g. when resuming a stream.
    pub fn with_factor(fact: i32) -> Self {
        Self { fact }
    }

    /// One step of the counter, without touching any state.
    ///
    /// Non-finite angles leave the factor unchanged.
    pub fn step(theta: f64, range: f64, fact: i32) -> i32 {
        if !theta.is_finite() {
            return fact;
        }
        let f = fact as f64;
        if fact == 0 && theta > range * (f + 1.0) {
            fact.saturating_add(1)
        } else if fact != 0 && theta > range + 2.0 * range * f {
            fact.saturating_add(1)
        } else if fact == 0 && theta < -range * (-f + 1.0) {
            fact.saturating_sub(1)
        } else if fact != 0 && theta < -range - 2.0 * range * (-f) {
            fact.saturating_sub(1)
        } else {
            fact
        }
    }
}

impl Unwrap for IncrementalUnwrap {
    fn unwrap(&mut self, theta: f64, range: f64) -> i32 {
        let next = Self::step(theta, range, self.fact);
        if next != self.fact {
            tracing::trace!(theta, range, from = self.fact, to = next, "Revolution factor changed");
        }
        self.fact = next;
        self.fact
    }

    fn factor(&self) -> i32 {
        self.fact
    }

    fn reset(&mut self) {
        self.fact = 0;
    }
}

/// Stateless closed-form counter for random-access playback.
///
/// The result depends on `theta` alone, so scrubbing to any index in any order
/// gives the same answer. The stored factor only backs [`Unwrap::factor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosedFormUnwrap {
    last: i32,
}

impl ClosedFormUnwrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factor for a single angle.
    ///
    /// The continuous angle lands in `(-range, range]`. Non-finite angles
    /// give 0 and factors beyond `i32` saturate.
    pub fn factor_for(theta: f64, range: f64) -> i32 {
        if !theta.is_finite() || !(range > 0.0) {
            return 0;
        }
        ((theta - range) / (2.0 * range)).ceil() as i32
    }
}

impl Unwrap for ClosedFormUnwrap {
    fn unwrap(&mut self, theta: f64, range: f64) -> i32 {
        self.last = Self::factor_for(theta, range);
        self.last
    }

    fn factor(&self) -> i32 {
        self.last
    }

    fn reset(&mut self) {
        self.last = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_form_examples() {
        assert_eq!(ClosedFormUnwrap::factor_for(190.0, 180.0), 1);
        assert_eq!(ClosedFormUnwrap::factor_for(-190.0, 180.0), -1);
        assert_eq!(ClosedFormUnwrap::factor_for(170.0, 180.0), 0);
        assert_eq!(ClosedFormUnwrap::factor_for(-170.0, 180.0), 0);
        assert_eq!(ClosedFormUnwrap::factor_for(600.0, 180.0), 2);
        assert_eq!(ClosedFormUnwrap::factor_for(-600.0, 180.0), -2);
        assert_eq!(ClosedFormUnwrap::factor_for(100.0, 90.0), 1);
    }

    #[test]
    fn closed_form_keeps_continuous_angle_in_principal_range() {
        for range in [90.0, 180.0] {
            let mut theta = -2000.0;
            while theta < 2000.0 {
                let factor = ClosedFormUnwrap::factor_for(theta, range);
                let c = continuous(theta, range, factor);
                assert!(c > -range && c <= range, "theta={theta} range={range} c={c}");
                theta += 7.3;
            }
        }
    }

    #[test]
    fn closed_form_maps_odd_multiples_to_upper_bound() {
        let cases = [
            (-180.0, 180.0, -1, 180.0),
            (180.0, 180.0, 0, 180.0),
            (540.0, 180.0, 1, 180.0),
            (-540.0, 180.0, -2, 180.0),
            (-90.0, 90.0, -1, 90.0),
            (90.0, 90.0, 0, 90.0),
        ];
        for (theta, range, factor, expected) in cases {
            assert_eq!(ClosedFormUnwrap::factor_for(theta, range), factor, "theta={theta}");
            assert_eq!(continuous(theta, range, factor), expected, "theta={theta}");
        }
    }

    #[test]
    fn closed_form_saturates_instead_of_overflowing() {
        assert_eq!(ClosedFormUnwrap::factor_for(1e12, 180.0), i32::MAX);
        assert_eq!(ClosedFormUnwrap::factor_for(-1e12, 180.0), i32::MIN);
        assert_eq!(ClosedFormUnwrap::factor_for(f64::INFINITY, 180.0), 0);
        assert_eq!(ClosedFormUnwrap::factor_for(f64::NEG_INFINITY, 90.0), 0);
    }

    #[test]
    fn closed_form_is_order_independent() {
        let samples = [10.0, 700.0, -400.0, 190.0, -190.0];
        let mut forward = ClosedFormUnwrap::new();
        let a: Vec<i32> = samples.iter().map(|&t| forward.unwrap(t, 180.0)).collect();

        let mut backward = ClosedFormUnwrap::new();
        let mut b: Vec<i32> = samples.iter().rev().map(|&t| backward.unwrap(t, 180.0)).collect();
        b.reverse();
        assert_eq!(a, b);
    }

    #[test]
    fn incremental_crosses_once_on_monotonic_sweep() {
        let mut unwrap = IncrementalUnwrap::new();
        let mut transitions = 0;
        let mut previous = unwrap.factor();
        let mut theta = 150.0;
        while theta < 300.0 {
            let factor = unwrap.unwrap(theta, 180.0);
            assert!((factor - previous).abs() <= 1);
            if factor != previous {
                transitions += 1;
            }
            previous = factor;
            theta += 5.0;
        }
        assert_eq!(transitions, 1);
        assert_eq!(unwrap.factor(), 1);
    }

    #[test]
    fn incremental_steps_at_most_once_per_call() {
        // A jump of several periods only advances the count by one.
        let mut unwrap = IncrementalUnwrap::new();
        assert_eq!(unwrap.unwrap(1000.0, 180.0), 1);
        assert_eq!(unwrap.unwrap(1000.0, 180.0), 2);
        assert_eq!(unwrap.unwrap(1000.0, 180.0), 3);
        assert_eq!(unwrap.unwrap(1000.0, 180.0), 3);
    }

    #[test]
    fn incremental_unwinds_symmetrically() {
        let mut unwrap = IncrementalUnwrap::new();
        assert_eq!(unwrap.unwrap(-185.0, 180.0), -1);
        assert!((continuous(-185.0, 180.0, -1) - 175.0).abs() < 1e-9);
        assert_eq!(unwrap.unwrap(-175.0, 180.0), 0);
        assert_eq!(unwrap.unwrap(185.0, 180.0), 1);
        assert_eq!(unwrap.unwrap(175.0, 180.0), 0);
    }

    #[test]
    fn incremental_differs_from_closed_form_after_large_jump() {
        let mut live = IncrementalUnwrap::new();
        assert_eq!(live.unwrap(1000.0, 180.0), 1);
        assert_eq!(ClosedFormUnwrap::factor_for(1000.0, 180.0), 3);
    }

    #[test]
    fn non_finite_angle_leaves_state_untouched() {
        let mut unwrap = IncrementalUnwrap::with_factor(2);
        assert_eq!(unwrap.unwrap(f64::NAN, 180.0), 2);
        assert_eq!(unwrap.unwrap(f64::INFINITY, 180.0), 2);
        assert_eq!(unwrap.unwrap(f64::NEG_INFINITY, 180.0), 2);
        unwrap.reset();
        assert_eq!(unwrap.unwrap(f64::INFINITY, 180.0), 0);
        assert_eq!(unwrap.factor(), 0);
        assert_eq!(ClosedFormUnwrap::factor_for(f64::NAN, 90.0), 0);
    }

    #[test]
    fn incremental_saturates_at_the_factor_limits() {
        let mut up = IncrementalUnwrap::with_factor(i32::MAX);
        assert_eq!(up.unwrap(f64::MAX, 180.0), i32::MAX);
        let mut down = IncrementalUnwrap::with_factor(i32::MIN);
        assert_eq!(down.unwrap(f64::MIN, 180.0), i32::MIN);
    }
}
