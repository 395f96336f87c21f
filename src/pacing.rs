//! Post-request pause between iterations
//!
//! A virtual user waits `base + u * jitter` after each request, with `u`
//! drawn uniformly from `[0, 1)`. The defaults give a pause in `[0.1s, 0.3s)`.

use crate::endpoints::RandomSource;
use std::time::Duration;

/// Uniformly jittered pause
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    base: Duration,
    jitter: Duration,
}

impl Pacing {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Draw the next pause, consuming one value from `rng`
    ///
    /// The jitter is floored to whole nanoseconds and kept strictly below
    /// `jitter`, so the pause never reaches `base + jitter`.
    pub fn next_pause<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Duration {
        let u = rng.next_unit();
        let jitter_ns = u64::try_from(self.jitter.as_nanos()).unwrap_or(u64::MAX);
        if jitter_ns == 0 {
            return self.base;
        }

        let scaled = (jitter_ns as f64 * u).floor() as u64;
        self.base + Duration::from_nanos(scaled.min(jitter_ns - 1))
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            jitter: Duration::from_millis(200),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::FixedSequence;

    #[test]
    fn test_default_pacing_is_100ms_plus_200ms_jitter() {
        let pacing = Pacing::default();
        assert_eq!(pacing.base(), Duration::from_millis(100));
        assert_eq!(pacing.jitter(), Duration::from_millis(200));
    }

    #[test]
    fn test_zero_draw_gives_base() {
        let pacing = Pacing::default();
        let mut rng = FixedSequence::new(vec![0.0]).unwrap();
        assert_eq!(pacing.next_pause(&mut rng), Duration::from_millis(100));
    }

    #[test]
    fn test_half_draw_gives_midpoint() {
        let pacing = Pacing::default();
        let mut rng = FixedSequence::new(vec![0.5]).unwrap();
        assert_eq!(pacing.next_pause(&mut rng), Duration::from_millis(200));
    }

    #[test]
    fn test_draw_just_below_one_stays_below_upper_bound() {
        let pacing = Pacing::default();
        let mut rng = FixedSequence::new(vec![1.0 - f64::EPSILON / 2.0]).unwrap();
        let pause = pacing.next_pause(&mut rng);
        assert!(pause < Duration::from_millis(300), "pause was {:?}", pause);
        assert!(pause >= Duration::from_millis(299));
    }

    #[test]
    fn test_draw_of_one_is_clamped_below_upper_bound() {
        let pacing = Pacing::default();
        let mut rng = FixedSequence::new(vec![1.0]).unwrap();
        assert_eq!(
            pacing.next_pause(&mut rng),
            Duration::from_millis(300) - Duration::from_nanos(1)
        );
    }

    #[test]
    fn test_zero_jitter_is_constant() {
        let pacing = Pacing::new(Duration::from_millis(50), Duration::ZERO);
        let mut rng = FixedSequence::new(vec![0.0, 0.3, 0.99]).unwrap();
        for _ in 0..3 {
            assert_eq!(pacing.next_pause(&mut rng), Duration::from_millis(50));
        }
    }
}
