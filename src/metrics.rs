//! Prometheus instrumentation for generated traffic
//!
//! Records raw per-request samples:
//! - Requests by endpoint and outcome
//! - Request latency by endpoint
//! - Completed iterations
//! - Currently running virtual users
//!
//! No aggregation happens here. The registry is encoded in Prometheus text
//! format and handed to whatever evaluates the run (see `loadmix run --metrics-file`).

use crate::error::AppResult;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one generated request, used as a metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Metrics collector for a load run
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    http_reqs: IntCounterVec,
    http_req_duration: HistogramVec,
    iterations: IntCounter,
    vus: IntGauge,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: N endpoints × 2 outcomes (bounded by the endpoint table)
        let http_reqs = IntCounterVec::new(
            Opts::new(
                "loadmix_http_reqs_total",
                "Total generated HTTP requests by endpoint and outcome",
            ),
            &["endpoint", "outcome"],
        )?;

        let http_req_duration = HistogramVec::new(
            HistogramOpts::new(
                "loadmix_http_req_duration_seconds",
                "Generated HTTP request latency in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["endpoint"],
        )?;

        let iterations = IntCounter::with_opts(Opts::new(
            "loadmix_iterations_total",
            "Total completed virtual-user iterations",
        ))?;

        let vus = IntGauge::with_opts(Opts::new(
            "loadmix_vus",
            "Virtual users currently running",
        ))?;

        registry.register(Box::new(http_reqs.clone()))?;
        registry.register(Box::new(http_req_duration.clone()))?;
        registry.register(Box::new(iterations.clone()))?;
        registry.register(Box::new(vus.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            http_reqs,
            http_req_duration,
            iterations,
            vus,
        })
    }

    /// Record one request
    ///
    /// # Errors
    ///
    /// Returns an error if the label set is rejected.
    pub fn record_request(
        &self,
        endpoint: &str,
        outcome: Outcome,
        elapsed: Duration,
    ) -> Result<(), prometheus::Error> {
        self.http_reqs
            .get_metric_with_label_values(&[endpoint, outcome.as_str()])?
            .inc();
        self.http_req_duration
            .get_metric_with_label_values(&[endpoint])?
            .observe(elapsed.as_secs_f64());
        Ok(())
    }

    pub fn record_iteration(&self) {
        self.iterations.inc();
    }

    pub fn set_vus(&self, active: usize) {
        self.vus.set(i64::try_from(active).unwrap_or(i64::MAX));
    }

    pub fn iterations_count(&self) -> u64 {
        self.iterations.get()
    }

    pub fn vus_count(&self) -> i64 {
        self.vus.get()
    }

    /// Requests recorded for `endpoint` with `outcome`
    pub fn requests_count(&self, endpoint: &str, outcome: Outcome) -> u64 {
        self.http_reqs
            .get_metric_with_label_values(&[endpoint, outcome.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Encode all metrics in Prometheus text exposition format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        tracing::debug!(
            metric_family_count = metric_families.len(),
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }

    /// Write the text exposition to `path`, replacing any existing file
    pub fn write_text_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let text = self.gather()?;
        std::fs::write(path.as_ref(), text)?;
        Ok(())
    }
}
