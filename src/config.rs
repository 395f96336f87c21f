//! Configuration management for loadmix
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Everything a run needs is carried in one explicit `Config` value that is
//! handed to the runtime; there is no process-wide mutable configuration.

use crate::duration::DurationSpec;
use crate::endpoints::EndpointTable;
use crate::error::{AppError, AppResult};
use crate::pacing::Pacing;
use crate::profile::LoadProfile;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    pub endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    pub pacing: PacingConfig,
    pub profile: LoadProfile,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// System under test
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Joined with endpoint paths that start with `/`
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

/// One `[[endpoints]]` entry
///
/// Fields are private; the validated form is `EndpointTable`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    url: String,
    /// Relative selection weight
    #[serde(default = "default_weight")]
    weight: f64,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>, weight: f64) -> Self {
        Self {
            url: url.into(),
            weight,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

fn default_weight() -> f64 {
    1.0
}

/// Pause after each request: `base + U[0,1) * jitter`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacingConfig {
    #[serde(default = "default_pacing_base")]
    pub base: DurationSpec,
    #[serde(default = "default_pacing_jitter")]
    pub jitter: DurationSpec,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base: default_pacing_base(),
            jitter: default_pacing_jitter(),
        }
    }
}

fn default_pacing_base() -> DurationSpec {
    DurationSpec::from_duration(Duration::from_millis(100))
}

fn default_pacing_jitter() -> DurationSpec {
    DurationSpec::from_duration(Duration::from_millis(200))
}

/// Run control
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Seed for per-VU random sources; VU `i` uses `seed + i`. Unset means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// How long stopping VUs may take to finish an in-flight request
    #[serde(default = "default_graceful_stop")]
    pub graceful_stop: DurationSpec,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            graceful_stop: default_graceful_stop(),
        }
    }
}

fn default_graceful_stop() -> DurationSpec {
    DurationSpec::from_duration(Duration::from_secs(30))
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Build the validated endpoint table
    pub fn endpoint_table(&self) -> AppResult<EndpointTable> {
        EndpointTable::from_config(self.target.base_url.as_deref(), &self.endpoints)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::new(
            self.pacing.base.as_duration(),
            self.pacing.jitter.as_duration(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.target.request_timeout_seconds)
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()`, but can also be called
    /// explicitly when constructing Config via other means (e.g., in tests).
    pub fn validate(&self) -> AppResult<()> {
        // Phase 1: target
        if let Some(base_url) = &self.target.base_url
            && !base_url.starts_with("http://")
            && !base_url.starts_with("https://")
        {
            return Err(AppError::Config(format!(
                "Configuration error: target.base_url '{}' must start with 'http://' or 'https://'.",
                base_url
            )));
        }

        if self.target.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "Configuration error: target.request_timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }
        if self.target.request_timeout_seconds > 300 {
            return Err(AppError::Config(format!(
                "Configuration error: target.request_timeout_seconds cannot exceed 300 seconds (5 minutes), got {}",
                self.target.request_timeout_seconds
            )));
        }

        // Phase 2: endpoint table (empty tables and bad weights are rejected here,
        // never at selection time)
        self.endpoint_table()?;

        // Phase 3: traffic profile and thresholds
        self.profile.validate()?;

        // Phase 4: observability
        if !LOG_LEVELS.contains(&self.observability.log_level.as_str()) {
            return Err(AppError::Config(format!(
                "Configuration error: observability.log_level '{}' is not one of {}",
                self.observability.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        // Validate config before returning
        config.validate()?;
        Ok(config)
    }
}
