//! Human-readable duration strings
//!
//! Accepts the forms used by load-test profiles: `"30s"`, `"1m"`, `"250ms"`,
//! `"2h"`, and compound values such as `"1m30s"`. Parsing happens during
//! deserialization, so a malformed value never reaches a validated `Config`.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A parsed duration that remembers how it was written
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct DurationSpec {
    raw: String,
    value: Duration,
}

impl DurationSpec {
    /// Parse a duration string
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidDuration` for empty input, a missing or unknown
    /// unit, a unit without a number, or an overflowing total.
    pub fn parse(input: &str) -> AppResult<Self> {
        let raw = input.trim();
        let invalid = |reason: String| AppError::InvalidDuration {
            input: input.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("duration cannot be empty".to_string()));
        }

        let mut total_ms: u64 = 0;
        let mut rest = raw;

        while !rest.is_empty() {
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digits_end == 0 {
                return Err(invalid(format!(
                    "expected a number before '{}'",
                    rest
                )));
            }
            let number: u64 = rest[..digits_end]
                .parse()
                .map_err(|e| invalid(format!("invalid number: {}", e)))?;
            rest = &rest[digits_end..];

            let unit_end = rest
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(rest.len());
            let unit = &rest[..unit_end];
            rest = &rest[unit_end..];

            let multiplier_ms = match unit {
                "ms" => 1,
                "s" => 1_000,
                "m" => 60_000,
                "h" => 3_600_000,
                "" => {
                    return Err(invalid(
                        "missing unit (use 'ms', 's', 'm' or 'h')".to_string(),
                    ));
                }
                other => {
                    return Err(invalid(format!(
                        "unknown unit '{}' (use 'ms', 's', 'm' or 'h')",
                        other
                    )));
                }
            };

            total_ms = number
                .checked_mul(multiplier_ms)
                .and_then(|ms| total_ms.checked_add(ms))
                .ok_or_else(|| invalid("duration is too large".to_string()))?;
        }

        Ok(Self {
            raw: raw.to_string(),
            value: Duration::from_millis(total_ms),
        })
    }

    /// Build from a `Duration`, rendering it in whole milliseconds
    pub fn from_duration(value: Duration) -> Self {
        Self {
            raw: format!("{}ms", value.as_millis()),
            value,
        }
    }

    /// The parsed value
    pub fn as_duration(&self) -> Duration {
        self.value
    }

    /// The text as written in the configuration
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl FromStr for DurationSpec {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DurationSpec {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DurationSpec> for String {
    fn from(spec: DurationSpec) -> Self {
        spec.raw
    }
}

impl From<DurationSpec> for Duration {
    fn from(spec: DurationSpec) -> Self {
        spec.value
    }
}

impl fmt::Display for DurationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
