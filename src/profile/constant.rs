//! Fixed concurrency for a fixed duration

use crate::duration::DurationSpec;
use crate::profile::threshold::Thresholds;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConstantProfile {
    vus: u32,
    duration: DurationSpec,
    #[serde(default, skip_serializing_if = "Thresholds::is_empty")]
    thresholds: Thresholds,
}

impl ConstantProfile {
    pub fn new(vus: u32, duration: DurationSpec) -> Self {
        Self {
            vus,
            duration,
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn vus(&self) -> u32 {
        self.vus
    }

    pub fn duration(&self) -> Duration {
        self.duration.as_duration()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// `vus` for the whole run, zero once the duration has elapsed
    pub fn vus_at(&self, elapsed: Duration) -> u32 {
        if elapsed < self.duration() { self.vus } else { 0 }
    }
}
