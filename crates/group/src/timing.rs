use std::future::Future;
use std::time::Duration;

use funcgroups_core::JobName;
use tokio::time::Instant;
use uuid::Uuid;

/// Whole milliseconds of `d` for log fields, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Run `fut` and log how long it took, tagged with the job's name.
///
/// Only wrapped around jobs when the group is in diagnostic mode.
pub(crate) async fn timed<F: Future>(run_id: Uuid, job: &JobName, fut: F) -> F::Output {
    let start = Instant::now();
    tracing::info!(%run_id, job = %job, "Job started");

    let output = fut.await;

    tracing::info!(
        %run_id,
        job = %job,
        elapsed_ms = millis(start.elapsed()),
        "Job finished",
    );
    output
}
