//! Periodic run driver
//!
//! The first run starts immediately, later runs on every tick of a fixed
//! interval. Runs are tasks owned by the scheduler; when a tick finds one still
//! in flight, the configured [`OverlapPolicy`] decides what happens.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::OverlapPolicy;

/// What the scheduler did before it stopped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub started: u64,
    pub skipped: u64,
    pub queued: u64,
    pub cancelled: u64,
    pub timed_out: u64,
}

pub struct Scheduler {
    period: Duration,
    policy: OverlapPolicy,
    run_timeout: Option<Duration>,
}

impl Scheduler {
    pub fn new(period: Duration, policy: OverlapPolicy) -> Self {
        Self {
            period,
            policy,
            run_timeout: None,
        }
    }

    /// Abort any run that takes longer than `limit`
    pub fn with_run_timeout(mut self, limit: Option<Duration>) -> Self {
        self.run_timeout = limit;
        self
    }

    /// Drive `job` until `shutdown` fires; in-flight runs are then aborted
    pub async fn run<F, Fut>(&self, job: F, mut shutdown: broadcast::Receiver<()>) -> SchedulerStats
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        info!("Scheduler started (overlap policy: {})", self.policy);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut runs: JoinSet<()> = JoinSet::new();
        let timed_out = Arc::new(AtomicU64::new(0));
        let mut stats = SchedulerStats::default();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    reap(&mut runs);

                    if !runs.is_empty() {
                        match self.policy {
                            OverlapPolicy::Skip => {
                                stats.skipped += 1;
                                warn!("Previous run still in progress, skipping this tick");
                                continue;
                            }
                            OverlapPolicy::Queue => {
                                stats.queued += 1;
                                info!("Previous run still in progress, waiting for it to finish");
                                tokio::select! {
                                    _ = drain(&mut runs) => {}
                                    _ = shutdown.recv() => break,
                                }
                            }
                            OverlapPolicy::Cancel => {
                                stats.cancelled += runs.len() as u64;
                                warn!("Previous run still in progress, cancelling it");
                                runs.abort_all();
                                drain(&mut runs).await;
                            }
                            OverlapPolicy::Overlap => {
                                warn!(
                                    "{} run(s) still in progress, starting another one",
                                    runs.len()
                                );
                            }
                        }
                    }

                    stats.started += 1;
                    let run_number = stats.started;
                    let run = job();
                    let limit = self.run_timeout;
                    let timed_out = timed_out.clone();

                    runs.spawn(async move {
                        match limit {
                            Some(limit) => {
                                if timeout(limit, run).await.is_err() {
                                    timed_out.fetch_add(1, Ordering::Relaxed);
                                    warn!("Run {} exceeded {}s and was aborted", run_number, limit.as_secs());
                                }
                            }
                            None => run.await,
                        }
                    });
                }
                _ = shutdown.recv() => break,
            }
        }

        reap(&mut runs);
        if !runs.is_empty() {
            info!("Aborting {} in-flight run(s)", runs.len());
            runs.abort_all();
            drain(&mut runs).await;
        }

        stats.timed_out = timed_out.load(Ordering::Relaxed);
        info!(
            "Scheduler stopped: {} started, {} skipped, {} queued, {} cancelled, {} timed out",
            stats.started, stats.skipped, stats.queued, stats.cancelled, stats.timed_out
        );
        stats
    }
}

/// Collect finished runs without waiting
fn reap(runs: &mut JoinSet<()>) {
    while let Some(result) = runs.try_join_next() {
        if let Err(e) = result {
            if e.is_panic() {
                error!("Run panicked: {}", e);
            }
        }
    }
}

async fn drain(runs: &mut JoinSet<()>) {
    while runs.join_next().await.is_some() {}
}
