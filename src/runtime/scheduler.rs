//! Virtual-user scheduler
//!
//! Every tick the scheduler compares the running VU count with the
//! profile's target for the elapsed time and spawns or stops VUs to match.
//! Stopping always takes the newest VUs first. When the profile ends, or the
//! external shutdown future resolves, every VU is told to stop and given
//! `graceful_stop` to finish its in-flight request before being aborted.

use crate::config::Config;
use crate::endpoints::WeightedEndpointPicker;
use crate::error::AppResult;
use crate::metrics::Metrics;
use crate::profile::LoadProfile;
use crate::runtime::client::RequestSender;
use crate::runtime::vu::{VirtualUser, VuContext};
use futures::future::join_all;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

/// Default interval between scaling decisions
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Shortest scaling interval `with_tick` accepts
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// What a finished run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub failed_requests: u64,
    pub peak_vus: usize,
    pub elapsed: Duration,
}

/// A spawned VU and the handle used to stop it
struct RunningVu {
    id: u64,
    stop: watch::Sender<bool>,
    handle: JoinHandle<u64>,
}

pub struct Scheduler {
    profile: LoadProfile,
    ctx: Arc<VuContext>,
    seed: Option<u64>,
    graceful_stop: Duration,
    tick: Duration,
}

impl Scheduler {
    /// Build a scheduler for `config`, sending requests through `sender`
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint table in `config` is invalid.
    pub fn new(
        config: &Config,
        sender: Arc<dyn RequestSender>,
        metrics: Metrics,
    ) -> AppResult<Self> {
        let table = config.endpoint_table()?;

        tracing::info!(
            endpoints = table.len(),
            total_weight = table.total_weight(),
            profile = config.profile.kind(),
            max_vus = config.profile.max_vus(),
            "Scheduler initialized"
        );

        let ctx = VuContext::new(
            WeightedEndpointPicker::new(Arc::new(table)),
            config.pacing(),
            sender,
            metrics,
        );

        Ok(Self {
            profile: config.profile.clone(),
            ctx: Arc::new(ctx),
            seed: config.run.seed,
            graceful_stop: config.run.graceful_stop.as_duration(),
            tick: DEFAULT_TICK,
        })
    }

    /// Override the scaling interval
    ///
    /// Clamped to at least 1 ms, since a zero-length interval cannot tick.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(MIN_TICK);
        self
    }

    /// Override the seed from config
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn profile(&self) -> &LoadProfile {
        &self.profile
    }

    /// Drive the profile to completion, or until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()> + Send,
    {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", run_id = %run_id, profile = self.profile.kind());
        self.drive(shutdown).instrument(span).await
    }

    async fn drive<F>(self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()> + Send,
    {
        let total = self.profile.total_duration();
        let started = Instant::now();
        let mut active: Vec<RunningVu> = Vec::new();
        let mut draining: Vec<JoinHandle<u64>> = Vec::new();
        let mut next_id = 0u64;
        let mut peak_vus = 0usize;

        tracing::info!(
            duration_ms = total.as_millis() as u64,
            seed = ?self.seed,
            "Run started"
        );

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = &mut shutdown => {
                    tracing::warn!(
                        active_vus = active.len(),
                        "Shutdown requested, stopping virtual users"
                    );
                    break;
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= total {
                break;
            }

            let desired = self.profile.vus_at(elapsed) as usize;

            while active.len() < desired {
                active.push(self.spawn_vu(next_id));
                next_id += 1;
            }
            while active.len() > desired {
                // Newest first
                if let Some(vu) = active.pop() {
                    tracing::trace!(vu = vu.id, "Stopping virtual user");
                    let _ = vu.stop.send(true);
                    draining.push(vu.handle);
                }
            }

            draining.retain(|handle| !handle.is_finished());
            peak_vus = peak_vus.max(active.len());
            self.ctx.metrics().set_vus(active.len());
        }

        for vu in &active {
            let _ = vu.stop.send(true);
        }
        draining.extend(active.into_iter().map(|vu| vu.handle));
        self.ctx.metrics().set_vus(0);

        self.wait_for_stragglers(draining).await;

        let summary = RunSummary {
            iterations: self.ctx.iterations(),
            failed_requests: self.ctx.failed_requests(),
            peak_vus,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            iterations = summary.iterations,
            failed_requests = summary.failed_requests,
            peak_vus = summary.peak_vus,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Run finished"
        );

        summary
    }

    fn spawn_vu(&self, id: u64) -> RunningVu {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id)),
            None => StdRng::from_os_rng(),
        };
        let (stop, stop_rx) = watch::channel(false);
        let vu = VirtualUser::new(id, rng, Arc::clone(&self.ctx));
        let span = tracing::debug_span!("vu", id);
        let handle = tokio::spawn(vu.run(stop_rx).instrument(span));

        RunningVu { id, stop, handle }
    }

    /// Wait up to `graceful_stop` for stopping VUs, then abort the rest
    async fn wait_for_stragglers(&self, mut handles: Vec<JoinHandle<u64>>) {
        if handles.is_empty() {
            return;
        }

        let waited =
            tokio::time::timeout(self.graceful_stop, join_all(handles.iter_mut())).await;

        match waited {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result
                        && e.is_panic()
                    {
                        tracing::error!(error = %e, "Virtual user task panicked");
                    }
                }
            }
            Err(_) => {
                let stragglers = handles.iter().filter(|h| !h.is_finished()).count();
                tracing::warn!(
                    stragglers,
                    graceful_stop_ms = self.graceful_stop.as_millis() as u64,
                    "Graceful stop elapsed, aborting remaining virtual users"
                );
                for handle in &handles {
                    handle.abort();
                }
            }
        }
    }
}
