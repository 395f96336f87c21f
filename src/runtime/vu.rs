//! Virtual user iteration loop
//!
//! A virtual user repeats: pick an endpoint, `GET` it, pause. Failed requests
//! are counted and logged, never retried. A stop signal is honoured between
//! iterations; an in-flight request is allowed to finish, a pause is cut short.

use crate::endpoints::{RandomSource, WeightedEndpointPicker};
use crate::error::RequestError;
use crate::metrics::{Metrics, Outcome};
use crate::pacing::Pacing;
use crate::runtime::client::RequestSender;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::watch;

/// State shared read-only (apart from counters) by all virtual users of a run
pub struct VuContext {
    picker: WeightedEndpointPicker,
    pacing: Pacing,
    sender: Arc<dyn RequestSender>,
    metrics: Metrics,
    iterations: AtomicU64,
    failed_requests: AtomicU64,
}

impl VuContext {
    pub fn new(
        picker: WeightedEndpointPicker,
        pacing: Pacing,
        sender: Arc<dyn RequestSender>,
        metrics: Metrics,
    ) -> Self {
        Self {
            picker,
            pacing,
            sender,
            metrics,
            iterations: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Iterations completed by every VU sharing this context
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }
}

/// One simulated client with its own random source
pub struct VirtualUser<R> {
    id: u64,
    rng: R,
    ctx: Arc<VuContext>,
}

impl<R: RandomSource + Send> VirtualUser<R> {
    pub fn new(id: u64, rng: R, ctx: Arc<VuContext>) -> Self {
        Self { id, rng, ctx }
    }

    /// Run one pick-and-request step, without the pause
    ///
    /// Metrics are recorded whatever the outcome. Returns the status on
    /// success so callers and tests can see what happened.
    pub async fn iterate(&mut self) -> Result<u16, RequestError> {
        let endpoint = self.ctx.picker.pick(&mut self.rng);
        let label = endpoint.label().to_string();
        let target = endpoint.target().to_string();

        let started = Instant::now();
        let result = self.ctx.sender.get(&target).await;
        let elapsed = started.elapsed();

        let outcome = match &result {
            Ok(status) => {
                tracing::trace!(
                    vu = self.id,
                    endpoint = %label,
                    status = *status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Request completed"
                );
                Outcome::Success
            }
            Err(e) => {
                self.ctx.failed_requests.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    vu = self.id,
                    endpoint = %label,
                    error_kind = e.kind(),
                    error = %e,
                    "Request failed"
                );
                Outcome::Failure
            }
        };

        // Metrics failures must not stop the load, log and carry on
        if let Err(e) = self.ctx.metrics.record_request(&label, outcome, elapsed) {
            tracing::error!(
                vu = self.id,
                endpoint = %label,
                error = %e,
                "Failed to record request metrics"
            );
        }
        self.ctx.iterations.fetch_add(1, Ordering::Relaxed);
        self.ctx.metrics.record_iteration();

        result
    }

    /// Iterate until `stop` flips to `true` or its sender is dropped
    ///
    /// Returns the number of iterations this VU completed.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> u64 {
        let mut completed = 0u64;
        tracing::debug!(vu = self.id, "Virtual user started");

        loop {
            if *stop.borrow() {
                break;
            }

            // Outcome already counted and logged by iterate()
            let _ = self.iterate().await;
            completed += 1;

            let pause = self.ctx.pacing.next_pause(&mut self.rng);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(vu = self.id, iterations = completed, "Virtual user stopped");
        completed
    }
}
