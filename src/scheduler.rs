// src/scheduler.rs
use metrics::counter;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::MirrorError;
use crate::processor::RunSummary;

/// Re-run `task` every `interval`, starting immediately. Each tick is an
/// independent run; a failed run is logged and the next tick still fires.
pub fn spawn_scheduler<F, Fut>(interval: Duration, mut task: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<RunSummary, MirrorError>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // a slow run must not trigger a burst of catch-up runs
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut run: u64 = 0;
        loop {
            ticker.tick().await;
            run += 1;
            counter!("mirror_runs_total").increment(1);

            match task().await {
                Ok(summary) => tracing::info!(
                    target: "scheduler",
                    run,
                    processed = summary.processed,
                    duplicates = summary.skipped_duplicate,
                    failed = summary.failed,
                    "scheduled run finished"
                ),
                Err(e) => tracing::error!(
                    target: "scheduler",
                    run,
                    kind = e.kind(),
                    error = %e,
                    "scheduled run failed"
                ),
            }
        }
    })
}
