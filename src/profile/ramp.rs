//! Staged virtual-user ramps
//!
//! Each stage moves the VU target linearly from the previous stage's target
//! (or `start_vus` for the first stage) to its own target over its duration.
//! A zero-length stage is a step.

use crate::duration::DurationSpec;
use crate::profile::threshold::Thresholds;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One ramp stage
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Stage {
    duration: DurationSpec,
    target: u32,
}

impl Stage {
    pub fn new(duration: DurationSpec, target: u32) -> Self {
        Self { duration, target }
    }

    pub fn duration(&self) -> Duration {
        self.duration.as_duration()
    }

    pub fn target(&self) -> u32 {
        self.target
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RampProfile {
    #[serde(default)]
    start_vus: u32,
    stages: Vec<Stage>,
    #[serde(default, skip_serializing_if = "Thresholds::is_empty")]
    thresholds: Thresholds,
}

impl RampProfile {
    pub fn new(start_vus: u32, stages: Vec<Stage>) -> Self {
        Self {
            start_vus,
            stages,
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn start_vus(&self) -> u32 {
        self.start_vus
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(Stage::duration).sum()
    }

    /// Highest VU count the ramp reaches
    pub fn max_vus(&self) -> u32 {
        self.stages
            .iter()
            .map(Stage::target)
            .fold(self.start_vus, u32::max)
    }

    /// Target VU count `elapsed` into the run, floored to a whole VU
    ///
    /// Past the last stage the final stage's target holds.
    pub fn vus_at(&self, elapsed: Duration) -> u32 {
        let mut from = self.start_vus;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration();
            if elapsed < stage_end {
                let progress =
                    (elapsed - stage_start).as_secs_f64() / stage.duration().as_secs_f64();
                let delta = f64::from(stage.target) - f64::from(from);
                return (f64::from(from) + delta * progress).floor() as u32;
            }
            from = stage.target;
            stage_start = stage_end;
        }

        from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(d: &str, target: u32) -> Stage {
        Stage::new(DurationSpec::parse(d).unwrap(), target)
    }

    /// 0 → 500 (30s) → 2000 (1m) → 5000 (1m) → 0 (30s)
    fn spike_ramp() -> RampProfile {
        RampProfile::new(
            0,
            vec![
                stage("30s", 500),
                stage("1m", 2000),
                stage("1m", 5000),
                stage("30s", 0),
            ],
        )
    }

    #[test]
    fn test_total_duration_sums_stages() {
        assert_eq!(spike_ramp().total_duration(), Duration::from_secs(180));
    }

    #[test]
    fn test_max_vus() {
        assert_eq!(spike_ramp().max_vus(), 5000);
        assert_eq!(RampProfile::new(7, vec![stage("1s", 3)]).max_vus(), 7);
    }

    #[test]
    fn test_vus_at_stage_boundaries() {
        let ramp = spike_ramp();
        assert_eq!(ramp.vus_at(Duration::ZERO), 0);
        assert_eq!(ramp.vus_at(Duration::from_secs(30)), 500);
        assert_eq!(ramp.vus_at(Duration::from_secs(90)), 2000);
        assert_eq!(ramp.vus_at(Duration::from_secs(150)), 5000);
        assert_eq!(ramp.vus_at(Duration::from_secs(180)), 0);
    }

    #[test]
    fn test_vus_at_interpolates_linearly() {
        let ramp = spike_ramp();
        assert_eq!(ramp.vus_at(Duration::from_secs(15)), 250);
        assert_eq!(ramp.vus_at(Duration::from_secs(60)), 1250);
        assert_eq!(ramp.vus_at(Duration::from_secs(120)), 3500);
        assert_eq!(ramp.vus_at(Duration::from_secs(165)), 2500);
    }

    #[test]
    fn test_vus_at_floors_fractional_values() {
        let ramp = RampProfile::new(0, vec![stage("3s", 1)]);
        assert_eq!(ramp.vus_at(Duration::from_secs(1)), 0);
        assert_eq!(ramp.vus_at(Duration::from_secs(2)), 0);
        assert_eq!(ramp.vus_at(Duration::from_millis(2999)), 0);
        assert_eq!(ramp.vus_at(Duration::from_secs(3)), 1);
    }

    #[test]
    fn test_vus_after_end_holds_last_target() {
        let ramp = RampProfile::new(0, vec![stage("10s", 40)]);
        assert_eq!(ramp.vus_at(Duration::from_secs(3600)), 40);
    }

    #[test]
    fn test_zero_length_stage_steps() {
        let ramp = RampProfile::new(0, vec![stage("0s", 100), stage("10s", 100)]);
        assert_eq!(ramp.vus_at(Duration::ZERO), 100);
        assert_eq!(ramp.vus_at(Duration::from_secs(5)), 100);
    }

    #[test]
    fn test_start_vus_is_initial_level() {
        let ramp = RampProfile::new(20, vec![stage("10s", 0)]);
        assert_eq!(ramp.vus_at(Duration::ZERO), 20);
        assert_eq!(ramp.vus_at(Duration::from_secs(5)), 10);
    }
}
