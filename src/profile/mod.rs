//! Traffic profiles
//!
//! A profile answers one question for the scheduler: how many virtual users
//! should be running `t` into the run, and when does the run end.

pub mod constant;
pub mod ramp;
pub mod threshold;

pub use constant::ConstantProfile;
pub use ramp::{RampProfile, Stage};
pub use threshold::{Aggregation, Comparison, Threshold, Thresholds};

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on virtual users in any profile
pub const MAX_VUS: u32 = 100_000;

/// Load profile, selected in config by `kind = "ramp"` or `kind = "constant"`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LoadProfile {
    Ramp(RampProfile),
    Constant(ConstantProfile),
}

/// One point of a sampled schedule, as printed by `loadmix plan`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SchedulePoint {
    pub at_seconds: f64,
    pub vus: u32,
}

impl LoadProfile {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ramp(_) => "ramp",
            Self::Constant(_) => "constant",
        }
    }

    pub fn total_duration(&self) -> Duration {
        match self {
            Self::Ramp(ramp) => ramp.total_duration(),
            Self::Constant(constant) => constant.duration(),
        }
    }

    pub fn vus_at(&self, elapsed: Duration) -> u32 {
        match self {
            Self::Ramp(ramp) => ramp.vus_at(elapsed),
            Self::Constant(constant) => constant.vus_at(elapsed),
        }
    }

    pub fn max_vus(&self) -> u32 {
        match self {
            Self::Ramp(ramp) => ramp.max_vus(),
            Self::Constant(constant) => constant.vus(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        match self {
            Self::Ramp(ramp) => ramp.thresholds(),
            Self::Constant(constant) => constant.thresholds(),
        }
    }

    /// Sample the VU target every `step`, always including the final instant
    ///
    /// A zero `step` yields just the start and end points.
    pub fn schedule(&self, step: Duration) -> Vec<SchedulePoint> {
        let total = self.total_duration();
        let mut points = Vec::new();
        let mut at = Duration::ZERO;

        if !step.is_zero() {
            while at < total {
                points.push(SchedulePoint {
                    at_seconds: at.as_secs_f64(),
                    vus: self.vus_at(at),
                });
                at += step;
            }
        } else {
            points.push(SchedulePoint {
                at_seconds: 0.0,
                vus: self.vus_at(Duration::ZERO),
            });
        }

        points.push(SchedulePoint {
            at_seconds: total.as_secs_f64(),
            vus: self.vus_at(total),
        });
        points
    }

    /// Check the profile can actually be run
    pub fn validate(&self) -> AppResult<()> {
        match self {
            Self::Ramp(ramp) => {
                if ramp.stages().is_empty() {
                    return Err(AppError::Config(
                        "profile.stages must contain at least one stage for kind = \"ramp\""
                            .to_string(),
                    ));
                }
                if ramp.total_duration().is_zero() {
                    return Err(AppError::Config(
                        "ramp stages must add up to a duration greater than 0".to_string(),
                    ));
                }
                if ramp.max_vus() > MAX_VUS {
                    return Err(AppError::Config(format!(
                        "ramp reaches {} VUs, which exceeds the limit of {}",
                        ramp.max_vus(),
                        MAX_VUS
                    )));
                }
            }
            Self::Constant(constant) => {
                if constant.vus() == 0 {
                    return Err(AppError::Config(
                        "profile.vus must be greater than 0 for kind = \"constant\"".to_string(),
                    ));
                }
                if constant.vus() > MAX_VUS {
                    return Err(AppError::Config(format!(
                        "profile.vus = {} exceeds the limit of {}",
                        constant.vus(),
                        MAX_VUS
                    )));
                }
                if constant.duration().is_zero() {
                    return Err(AppError::Config(
                        "profile.duration must be greater than 0".to_string(),
                    ));
                }
            }
        }

        self.thresholds().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::DurationSpec;

    fn d(s: &str) -> DurationSpec {
        DurationSpec::parse(s).unwrap()
    }

    #[test]
    fn test_deserialize_ramp_profile() {
        let profile: LoadProfile = toml::from_str(
            r#"
kind = "ramp"
stages = [
    { duration = "30s", target = 500 },
    { duration = "1m", target = 2000 },
]
"#,
        )
        .unwrap();

        assert_eq!(profile.kind(), "ramp");
        assert_eq!(profile.total_duration(), Duration::from_secs(90));
        assert_eq!(profile.max_vus(), 2000);
        assert!(profile.thresholds().is_empty());
    }

    #[test]
    fn test_deserialize_constant_profile_with_thresholds() {
        let profile: LoadProfile = toml::from_str(
            r#"
kind = "constant"
vus = 150
duration = "600s"

[thresholds]
http_req_failed = ["rate<0.01"]
http_req_duration = ["p(95)<500"]
"#,
        )
        .unwrap();

        assert_eq!(profile.kind(), "constant");
        assert_eq!(profile.max_vus(), 150);
        assert_eq!(profile.thresholds().len(), 2);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_deserialize_unknown_kind_fails() {
        let result: Result<LoadProfile, _> = toml::from_str(r#"kind = "spike""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_bad_duration_fails() {
        let result: Result<LoadProfile, _> = toml::from_str(
            r#"
kind = "constant"
vus = 10
duration = "ten seconds"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_stages() {
        let profile = LoadProfile::Ramp(RampProfile::new(0, vec![]));
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("at least one stage"));
    }

    #[test]
    fn test_validate_rejects_zero_length_ramp() {
        let profile = LoadProfile::Ramp(RampProfile::new(0, vec![Stage::new(d("0s"), 10)]));
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_too_many_vus() {
        let ramp = LoadProfile::Ramp(RampProfile::new(
            0,
            vec![Stage::new(d("10s"), MAX_VUS + 1)],
        ));
        assert!(ramp.validate().is_err());

        let constant = LoadProfile::Constant(ConstantProfile::new(MAX_VUS + 1, d("10s")));
        assert!(constant.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_constant() {
        assert!(
            LoadProfile::Constant(ConstantProfile::new(0, d("10s")))
                .validate()
                .is_err()
        );
        assert!(
            LoadProfile::Constant(ConstantProfile::new(5, d("0s")))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_validate_rejects_incompatible_threshold() {
        let thresholds = Thresholds::new().with(
            "http_req_failed",
            Threshold::parse("p(95)<500").unwrap(),
        );
        let profile = LoadProfile::Constant(
            ConstantProfile::new(10, d("10s")).with_thresholds(thresholds),
        );
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_schedule_samples_and_includes_end() {
        let profile = LoadProfile::Ramp(RampProfile::new(
            0,
            vec![Stage::new(d("20s"), 100), Stage::new(d("10s"), 0)],
        ));
        let points = profile.schedule(Duration::from_secs(10));

        let vus: Vec<u32> = points.iter().map(|p| p.vus).collect();
        let at: Vec<f64> = points.iter().map(|p| p.at_seconds).collect();
        assert_eq!(at, vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(vus, vec![0, 50, 100, 0]);
    }

    #[test]
    fn test_schedule_zero_step_gives_endpoints() {
        let profile = LoadProfile::Constant(ConstantProfile::new(3, d("5s")));
        let points = profile.schedule(Duration::ZERO);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].vus, 3);
        assert_eq!(points[1].vus, 0);
    }
}
