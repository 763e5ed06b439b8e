/*
[INPUT]:  A job closure, an interval and a shutdown token
[OUTPUT]: Repeated job runs until cancellation
[POS]:    Scheduling layer - timer loop
[UPDATE]: When changing pacing or shutdown semantics
*/

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run a job now and then once per interval until shutdown.
///
/// A run that fails is logged and the loop continues. A run that overruns
/// the interval starts the next run immediately and is flagged as past
/// due. Cancellation is honored between runs; a run already in flight
/// completes first.
pub async fn run_repeating(
    job_name: &str,
    every: Duration,
    shutdown: CancellationToken,
    mut job: impl AsyncFnMut() -> anyhow::Result<()>,
) {
    loop {
        let started = Instant::now();
        info!(job = job_name, "job run starting");

        match job().await {
            Ok(()) => info!(job = job_name, elapsed = ?started.elapsed(), "job run finished"),
            Err(err) => error!(job = job_name, error = ?err, "job run failed"),
        }

        let elapsed = started.elapsed();
        if elapsed > every {
            warn!(
                job = job_name,
                elapsed = ?elapsed,
                interval = ?every,
                "the timer is past due"
            );
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(job = job_name, "shutdown requested, stopping scheduler");
                return;
            }
            _ = tokio::time::sleep(every.saturating_sub(elapsed)) => {}
        }
    }
}
