//! Pass/fail threshold expressions
//!
//! Thresholds are written as `<aggregation><operator><value>`, for example
//! `"rate<0.01"` or `"p(95)<500"`, and grouped under a metric name. They are
//! parsed and checked against the metric they belong to at load time. Judging
//! a finished run against them is left to whatever consumes the exported
//! metrics.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Metrics that thresholds may be attached to
pub const KNOWN_METRICS: &[&str] = &[
    "http_req_failed",
    "http_req_duration",
    "http_reqs",
    "iterations",
];

/// How the samples of a metric are reduced to one number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Rate,
    Count,
    Avg,
    Min,
    Max,
    Med,
    /// Percentile in `(0, 100]`
    Percentile(f64),
}

impl Aggregation {
    fn parse(input: &str) -> Result<Self, String> {
        match input {
            "rate" => Ok(Self::Rate),
            "count" => Ok(Self::Count),
            "avg" => Ok(Self::Avg),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "med" => Ok(Self::Med),
            other => {
                let inner = other
                    .strip_prefix("p(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(|| format!("unknown aggregation '{}'", other))?;
                let pct: f64 = inner
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid percentile '{}'", inner))?;
                if !(pct > 0.0 && pct <= 100.0) {
                    return Err(format!("percentile must be in (0, 100], got {}", pct));
                }
                Ok(Self::Percentile(pct))
            }
        }
    }

    /// Whether this aggregation makes sense for `metric`
    pub fn applies_to(&self, metric: &str) -> bool {
        match metric {
            "http_req_failed" => matches!(self, Self::Rate),
            "http_req_duration" => matches!(
                self,
                Self::Avg | Self::Min | Self::Max | Self::Med | Self::Percentile(_)
            ),
            "http_reqs" | "iterations" => matches!(self, Self::Count | Self::Rate),
            _ => false,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate => f.write_str("rate"),
            Self::Count => f.write_str("count"),
            Self::Avg => f.write_str("avg"),
            Self::Min => f.write_str("min"),
            Self::Max => f.write_str("max"),
            Self::Med => f.write_str("med"),
            Self::Percentile(p) => write!(f, "p({})", p),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    // Two-character operators first so "<=" is not read as "<"
    const TOKENS: [(&'static str, Comparison); 6] = [
        ("<=", Comparison::Le),
        (">=", Comparison::Ge),
        ("==", Comparison::Eq),
        ("!=", Comparison::Ne),
        ("<", Comparison::Lt),
        (">", Comparison::Gt),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// One parsed threshold expression
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Threshold {
    raw: String,
    aggregation: Aggregation,
    comparison: Comparison,
    value: f64,
}

impl Threshold {
    /// # Errors
    ///
    /// Returns `AppError::InvalidThreshold` when the operator, aggregation or
    /// value cannot be parsed.
    pub fn parse(input: &str) -> AppResult<Self> {
        let raw = input.trim();
        let invalid = |reason: String| AppError::InvalidThreshold {
            input: input.to_string(),
            reason,
        };

        let op_start = raw
            .find(['<', '>', '=', '!'])
            .ok_or_else(|| invalid("missing comparison operator".to_string()))?;
        let (lhs, rest) = raw.split_at(op_start);

        let (token, comparison) = Comparison::TOKENS
            .iter()
            .find(|(token, _)| rest.starts_with(token))
            .copied()
            .ok_or_else(|| invalid(format!("unknown operator in '{}'", rest)))?;

        let aggregation = Aggregation::parse(lhs.trim()).map_err(invalid)?;

        let value_str = rest[token.len()..].trim();
        let value: f64 = value_str
            .parse()
            .map_err(|_| invalid(format!("invalid value '{}'", value_str)))?;
        if !value.is_finite() {
            return Err(invalid(format!("value must be finite, got {}", value)));
        }

        Ok(Self {
            raw: raw.to_string(),
            aggregation,
            comparison,
            value,
        })
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Threshold {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Threshold {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Threshold> for String {
    fn from(threshold: Threshold) -> Self {
        threshold.raw
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.aggregation,
            self.comparison.as_str(),
            self.value
        )
    }
}

/// Thresholds keyed by metric name
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Thresholds(BTreeMap<String, Vec<Threshold>>);

impl Thresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: impl Into<String>, threshold: Threshold) -> Self {
        self.0.entry(metric.into()).or_default().push(threshold);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn get(&self, metric: &str) -> Option<&[Threshold]> {
        self.0.get(metric).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Threshold)> {
        self.0
            .iter()
            .flat_map(|(metric, list)| list.iter().map(move |t| (metric.as_str(), t)))
    }

    /// Check every threshold names a known metric with a compatible aggregation
    pub fn validate(&self) -> AppResult<()> {
        for (metric, threshold) in self.iter() {
            if !KNOWN_METRICS.contains(&metric) {
                return Err(AppError::Config(format!(
                    "Unknown threshold metric '{}'. Known metrics: {}",
                    metric,
                    KNOWN_METRICS.join(", ")
                )));
            }
            if !threshold.aggregation().applies_to(metric) {
                return Err(AppError::InvalidThreshold {
                    input: threshold.as_str().to_string(),
                    reason: format!(
                        "aggregation '{}' cannot be used with metric '{}'",
                        threshold.aggregation(),
                        metric
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_threshold() {
        let t = Threshold::parse("rate<0.01").unwrap();
        assert_eq!(t.aggregation(), Aggregation::Rate);
        assert_eq!(t.comparison(), Comparison::Lt);
        assert_eq!(t.value(), 0.01);
    }

    #[test]
    fn test_parse_percentile_threshold() {
        let t = Threshold::parse("p(95)<500").unwrap();
        assert_eq!(t.aggregation(), Aggregation::Percentile(95.0));
        assert_eq!(t.value(), 500.0);

        let t = Threshold::parse("p(99.9) <= 1500").unwrap();
        assert_eq!(t.aggregation(), Aggregation::Percentile(99.9));
        assert_eq!(t.comparison(), Comparison::Le);
    }

    #[test]
    fn test_parse_two_char_operators() {
        assert_eq!(Threshold::parse("avg>=1").unwrap().comparison(), Comparison::Ge);
        assert_eq!(Threshold::parse("max==2").unwrap().comparison(), Comparison::Eq);
        assert_eq!(Threshold::parse("min!=3").unwrap().comparison(), Comparison::Ne);
        assert_eq!(Threshold::parse("med>4").unwrap().comparison(), Comparison::Gt);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Threshold::parse("rate").is_err());
        assert!(Threshold::parse("rate<").is_err());
        assert!(Threshold::parse("rate<abc").is_err());
        assert!(Threshold::parse("mean<1").is_err());
        assert!(Threshold::parse("p(0)<1").is_err());
        assert!(Threshold::parse("p(101)<1").is_err());
        assert!(Threshold::parse("p95<1").is_err());
        assert!(Threshold::parse("rate=<1").is_err());
        assert!(Threshold::parse("rate<inf").is_err());
    }

    #[test]
    fn test_thresholds_validate_metric_compatibility() {
        let ok = Thresholds::new()
            .with("http_req_failed", Threshold::parse("rate<0.01").unwrap())
            .with("http_req_duration", Threshold::parse("p(95)<500").unwrap());
        assert!(ok.validate().is_ok());
        assert_eq!(ok.len(), 2);

        let wrong_agg =
            Thresholds::new().with("http_req_failed", Threshold::parse("p(95)<1").unwrap());
        assert!(wrong_agg.validate().is_err());

        let unknown = Thresholds::new().with("cpu", Threshold::parse("avg<1").unwrap());
        let err = unknown.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown threshold metric 'cpu'"));
    }

    #[test]
    fn test_thresholds_deserialize_from_toml() {
        let thresholds: Thresholds = toml::from_str(
            r#"
http_req_failed = ["rate<0.01"]
http_req_duration = ["p(95)<500", "avg<200"]
"#,
        )
        .unwrap();
        assert_eq!(thresholds.len(), 3);
        assert_eq!(thresholds.get("http_req_duration").unwrap().len(), 2);
        assert!(thresholds.get("iterations").is_none());
    }

    #[test]
    fn test_display_normalises_spacing() {
        let t = Threshold::parse(" p(95) < 500 ").unwrap();
        assert_eq!(t.to_string(), "p(95)<500");
        assert_eq!(t.as_str(), "p(95) < 500");
    }
}
