//! Injected source of uniform random draws
//!
//! Selection and pacing never reach for a global generator. Each virtual user
//! owns a `RandomSource`, which keeps selection lock-free and makes seeded runs
//! reproducible.

use crate::error::{AppError, AppResult};
use rand::Rng;
use rand::rngs::{StdRng, ThreadRng};

/// Uniform draws in `[0, 1)`
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl RandomSource for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

impl RandomSource for ThreadRng {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Scripted draws, replayed in order and cycled when exhausted
///
/// Accepts values in the closed interval `[0, 1]` so boundary behaviour
/// (a draw equal to the total weight) can be exercised.
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<f64>,
    cursor: usize,
}

impl FixedSequence {
    /// # Errors
    ///
    /// Returns `AppError::Config` if `values` is empty or holds a value
    /// outside `[0, 1]` (including NaN).
    pub fn new(values: Vec<f64>) -> AppResult<Self> {
        if values.is_empty() {
            return Err(AppError::Config(
                "FixedSequence requires at least one value".to_string(),
            ));
        }
        if let Some(bad) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(AppError::Config(format!(
                "FixedSequence values must lie in [0, 1], got {}",
                bad
            )));
        }
        Ok(Self { values, cursor: 0 })
    }

    /// Number of draws taken so far
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for FixedSequence {
    fn next_unit(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_fixed_sequence_replays_and_cycles() {
        let mut seq = FixedSequence::new(vec![0.0, 0.5, 0.9]).unwrap();
        let drawn: Vec<f64> = (0..5).map(|_| seq.next_unit()).collect();
        assert_eq!(drawn, vec![0.0, 0.5, 0.9, 0.0, 0.5]);
        assert_eq!(seq.draws(), 5);
    }

    #[test]
    fn test_fixed_sequence_rejects_empty() {
        assert!(FixedSequence::new(vec![]).is_err());
    }

    #[test]
    fn test_fixed_sequence_rejects_out_of_range() {
        assert!(FixedSequence::new(vec![1.5]).is_err());
        assert!(FixedSequence::new(vec![-0.1]).is_err());
        assert!(FixedSequence::new(vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_fixed_sequence_accepts_closed_upper_bound() {
        let mut seq = FixedSequence::new(vec![1.0]).unwrap();
        assert_eq!(seq.next_unit(), 1.0);
    }

    #[test]
    fn test_std_rng_draws_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let v = rng.next_unit();
            assert!((0.0..1.0).contains(&v), "draw {} outside [0, 1)", v);
        }
    }

    #[test]
    fn test_seeded_std_rng_is_reproducible() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_thread_rng_draws_in_unit_interval() {
        let mut rng = rand::rng();
        for _ in 0..1_000 {
            let v = rng.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
