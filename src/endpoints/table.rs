//! Validated endpoint table
//!
//! The table is built once at startup and never mutated. All invariants the
//! picker relies on are checked here, so a constructed table is always safe
//! to select from.

use crate::config::EndpointConfig;
use crate::error::{AppError, AppResult};

/// A single request target and its relative selection weight
///
/// Fields are private: an `Endpoint` only becomes usable once it has passed
/// through [`EndpointTable::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    label: String,
    target: String,
    weight: f64,
}

impl Endpoint {
    /// Create an endpoint whose label is its target URL
    pub fn new(target: impl Into<String>, weight: f64) -> Self {
        let target = target.into();
        Self {
            label: target.clone(),
            target,
            weight,
        }
    }

    /// Create an endpoint with a short label (used in logs and metric labels)
    pub fn with_label(label: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self {
            label: label.into(),
            target: target.into(),
            weight,
        }
    }

    /// Absolute URL requests are sent to
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Label as written in the configuration (e.g. `/categories`)
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Ordered, non-empty sequence of endpoints with positive finite weights
#[derive(Debug, Clone)]
pub struct EndpointTable {
    endpoints: Vec<Endpoint>,
    total_weight: f64,
}

impl EndpointTable {
    /// Build a table, rejecting anything selection could not handle
    ///
    /// # Errors
    ///
    /// - `AppError::EmptyEndpointTable` if `endpoints` is empty
    /// - `AppError::InvalidWeight` for a zero, negative, NaN or infinite weight
    /// - `AppError::InvalidTarget` for a target that is not an `http(s)://` URL
    /// - `AppError::Config` if the weights sum to infinity
    pub fn new(endpoints: Vec<Endpoint>) -> AppResult<Self> {
        if endpoints.is_empty() {
            return Err(AppError::EmptyEndpointTable);
        }

        for endpoint in &endpoints {
            if !(endpoint.weight.is_finite() && endpoint.weight > 0.0) {
                return Err(AppError::InvalidWeight {
                    target: endpoint.label.clone(),
                    weight: endpoint.weight,
                });
            }

            if !endpoint.target.starts_with("http://") && !endpoint.target.starts_with("https://")
            {
                return Err(AppError::InvalidTarget {
                    target: endpoint.target.clone(),
                    reason: "must start with 'http://' or 'https://'".to_string(),
                });
            }
        }

        let total_weight: f64 = endpoints.iter().map(|e| e.weight).sum();
        if !total_weight.is_finite() {
            return Err(AppError::Config(format!(
                "Sum of endpoint weights overflows ({} endpoints). Use smaller weights.",
                endpoints.len()
            )));
        }

        tracing::debug!(
            endpoints = endpoints.len(),
            total_weight = total_weight,
            "Endpoint table constructed"
        );

        Ok(Self {
            endpoints,
            total_weight,
        })
    }

    /// Build a table from configuration entries
    ///
    /// Entries whose `url` starts with `/` are joined onto `base_url`; absolute
    /// `http(s)://` entries are used as-is.
    pub fn from_config(base_url: Option<&str>, entries: &[EndpointConfig]) -> AppResult<Self> {
        let mut endpoints = Vec::with_capacity(entries.len());

        for entry in entries {
            let url = entry.url();
            let target = if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else if url.starts_with('/') {
                let Some(base) = base_url else {
                    return Err(AppError::InvalidTarget {
                        target: url.to_string(),
                        reason: "relative path requires target.base_url to be set".to_string(),
                    });
                };
                format!("{}{}", base.trim_end_matches('/'), url)
            } else {
                return Err(AppError::InvalidTarget {
                    target: url.to_string(),
                    reason: "must be an absolute http(s):// URL or a path starting with '/'"
                        .to_string(),
                });
            };

            endpoints.push(Endpoint::with_label(url, target, entry.weight()));
        }

        Self::new(endpoints)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always false for a constructed table
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
        self.endpoints.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Endpoint> {
        self.endpoints.get(index)
    }

    /// Last entry in table order
    pub fn last(&self) -> &Endpoint {
        // Non-empty by construction
        &self.endpoints[self.endpoints.len() - 1]
    }

    /// Whether `target` is one of the table's resolved URLs
    pub fn contains_target(&self, target: &str) -> bool {
        self.endpoints.iter().any(|e| e.target == target)
    }
}

impl<'a> IntoIterator for &'a EndpointTable {
    type Item = &'a Endpoint;
    type IntoIter = std::slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.endpoints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_endpoints() -> Vec<Endpoint> {
        vec![
            Endpoint::new("http://localhost:3000/categories", 5.0),
            Endpoint::new("http://localhost:3000/challenges", 3.0),
        ]
    }

    #[test]
    fn test_table_new_accepts_valid_endpoints() {
        let table = EndpointTable::new(two_endpoints()).expect("valid table");
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
        assert_eq!(table.total_weight(), 8.0);
        assert_eq!(table.last().target(), "http://localhost:3000/challenges");
    }

    #[test]
    fn test_table_rejects_empty() {
        let err = EndpointTable::new(vec![]).unwrap_err();
        assert!(matches!(err, AppError::EmptyEndpointTable));
    }

    #[test]
    fn test_table_rejects_zero_weight() {
        let err = EndpointTable::new(vec![Endpoint::new("http://a/x", 0.0)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidWeight { weight, .. } if weight == 0.0));
    }

    #[test]
    fn test_table_rejects_all_zero_weights() {
        let err = EndpointTable::new(vec![
            Endpoint::new("http://a/x", 0.0),
            Endpoint::new("http://a/y", 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidWeight { .. }));
    }

    #[test]
    fn test_table_rejects_negative_nan_and_infinite_weights() {
        for weight in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = EndpointTable::new(vec![Endpoint::new("http://a/x", weight)]);
            assert!(
                matches!(result, Err(AppError::InvalidWeight { .. })),
                "weight {} should be rejected",
                weight
            );
        }
    }

    #[test]
    fn test_table_rejects_overflowing_total() {
        let err = EndpointTable::new(vec![
            Endpoint::new("http://a/x", f64::MAX),
            Endpoint::new("http://a/y", f64::MAX),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_table_rejects_non_http_target() {
        let err = EndpointTable::new(vec![Endpoint::new("ftp://a/x", 1.0)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidTarget { .. }));
    }

    #[test]
    fn test_from_config_joins_relative_paths() {
        let entries = vec![
            EndpointConfig::new("/categories", 5.0),
            EndpointConfig::new("https://other.example/health", 1.0),
        ];
        let table = EndpointTable::from_config(Some("http://localhost:3000/"), &entries).unwrap();

        assert_eq!(
            table.get(0).unwrap().target(),
            "http://localhost:3000/categories"
        );
        assert_eq!(table.get(0).unwrap().label(), "/categories");
        assert_eq!(
            table.get(1).unwrap().target(),
            "https://other.example/health"
        );
        assert!(table.contains_target("http://localhost:3000/categories"));
        assert!(!table.contains_target("http://localhost:3000/challenges"));
    }

    #[test]
    fn test_from_config_relative_without_base_fails() {
        let entries = vec![EndpointConfig::new("/categories", 5.0)];
        let err = EndpointTable::from_config(None, &entries).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_from_config_rejects_bare_path() {
        let entries = vec![EndpointConfig::new("categories", 5.0)];
        let err = EndpointTable::from_config(Some("http://localhost:3000"), &entries).unwrap_err();
        assert!(matches!(err, AppError::InvalidTarget { .. }));
    }

    #[test]
    fn test_iteration_preserves_table_order() {
        let table = EndpointTable::new(two_endpoints()).unwrap();
        let weights: Vec<f64> = table.iter().map(|e| e.weight()).collect();
        assert_eq!(weights, vec![5.0, 3.0]);

        let mut count = 0;
        for _ in &table {
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
