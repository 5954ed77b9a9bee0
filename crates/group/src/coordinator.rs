//! Fan-out / fan-in engine behind every group run.
//!
//! One Tokio task per job; each task sends exactly one [`Completion`]
//! through a bounded channel whose capacity equals the job count, so no
//! task ever waits to report, even after the coordinator stopped
//! listening. The coordinator is the only consumer and the only place
//! results are merged.

use std::time::Duration;

use chrono::Utc;
use funcgroups_core::{CancelReason, GroupConfig, JobName, RunReport, RunStatus};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::job::Job;
use crate::timing;

/// Log at `info` in diagnostic mode, `debug` otherwise.
macro_rules! diag {
    ($diagnostic:expr, $($arg:tt)+) => {
        if $diagnostic {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

/// The single message a job task sends when its body has finished.
///
/// `outcome` is `Err(message)` if the job panicked.
pub(crate) struct Completion<T> {
    pub(crate) job: JobName,
    pub(crate) outcome: Result<T, String>,
}

/// Cancellation scope of one run invocation.
pub(crate) struct RunScope<'a> {
    token: CancellationToken,
    parent: Option<&'a CancellationToken>,
    deadline: Duration,
}

impl<'a> RunScope<'a> {
    /// Derive a fresh run token from `parent`, or from a new root when
    /// there is no parent.
    pub(crate) fn new(parent: Option<&'a CancellationToken>, deadline: Duration) -> Self {
        let token = match parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        Self {
            token,
            parent,
            deadline,
        }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    fn cancel_reason(&self) -> CancelReason {
        match self.parent {
            Some(parent) if parent.is_cancelled() => CancelReason::ParentCancelled,
            _ => CancelReason::Cancelled,
        }
    }
}

/// Completion counters kept by the coordinator.
#[derive(Debug, Default)]
struct Tally {
    completed: usize,
    panicked: usize,
}

impl Tally {
    fn record<T, F>(&mut self, run_id: Uuid, completion: Completion<T>, on_complete: &mut F)
    where
        F: FnMut(Completion<T>),
    {
        self.completed += 1;
        if let Err(panic) = &completion.outcome {
            self.panicked += 1;
            tracing::error!(
                %run_id,
                job = %completion.job,
                panic = %panic,
                "Job panicked",
            );
        }
        on_complete(completion);
    }
}

/// Launch every job, then wait for all completions, the deadline, or
/// cancellation of the run token.
///
/// `on_complete` is called on the coordinator for each completion
/// received before the run returns; completions arriving afterwards are
/// dropped with the channel.
pub(crate) async fn run_jobs<T, F>(
    jobs: &[Job<T>],
    config: &GroupConfig,
    scope: RunScope<'_>,
    mut on_complete: F,
) -> RunReport
where
    T: Send + 'static,
    F: FnMut(Completion<T>),
{
    let run_id = Uuid::now_v7();
    let started_at = Utc::now();
    let start = Instant::now();
    let launched = jobs.len();
    let diagnostic = config.diagnostic;

    let mut tally = Tally::default();

    diag!(
        diagnostic,
        %run_id,
        jobs = launched,
        deadline_ms = timing::millis(scope.deadline),
        "Starting {launched} jobs",
    );

    let status = if launched == 0 {
        RunStatus::Completed
    } else {
        let (tx, mut rx) = mpsc::channel::<Completion<T>>(launched);

        for job in jobs {
            let tx = tx.clone();
            let name = job.name().clone();
            let body = job.execute();

            tokio::spawn(async move {
                let outcome = if diagnostic {
                    timing::timed(run_id, &name, body).await
                } else {
                    body.await
                };
                // Never waits: capacity covers every job. Errors only when
                // the coordinator has already returned.
                let _ = tx.send(Completion { job: name, outcome }).await;
            });
        }
        drop(tx);

        let deadline = tokio::time::sleep(scope.deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                _ = scope.token.cancelled() => {
                    break RunStatus::Cancelled(scope.cancel_reason());
                }
                Some(completion) = rx.recv() => {
                    tally.record(run_id, completion, &mut on_complete);
                    if tally.completed == launched {
                        break RunStatus::Completed;
                    }
                }
                _ = &mut deadline => {
                    // Jobs woken by the same timer tick report before the
                    // deadline is declared.
                    tokio::task::yield_now().await;
                    while let Ok(completion) = rx.try_recv() {
                        tally.record(run_id, completion, &mut on_complete);
                    }
                    break if tally.completed == launched {
                        RunStatus::Completed
                    } else {
                        RunStatus::Cancelled(CancelReason::DeadlineExceeded)
                    };
                }
            }
        }
    };

    // Releases the deadline and anything derived from the run token.
    scope.token.cancel();

    let Tally {
        completed,
        panicked,
    } = tally;
    let elapsed = start.elapsed();
    match status {
        RunStatus::Completed => {
            diag!(
                diagnostic,
                %run_id,
                elapsed_ms = timing::millis(elapsed),
                "All {launched} jobs done",
            );
        }
        RunStatus::Cancelled(reason) => {
            diag!(
                diagnostic,
                %run_id,
                reason = %reason,
                completed,
                remaining = launched - completed,
                elapsed_ms = timing::millis(elapsed),
                "Stopped waiting for jobs",
            );
        }
    }

    RunReport {
        run_id,
        started_at,
        status,
        launched,
        completed,
        panicked,
        deadline: scope.deadline,
        elapsed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;

    fn sleeper(secs: u64) -> Job {
        Job::new(move || tokio::time::sleep(Duration::from_secs(secs)))
            .with_name(format!("{secs}s"))
    }

    #[tokio::test(start_paused = true)]
    async fn every_job_reaches_on_complete_once() {
        let jobs: Vec<Job> = (1..=4).map(sleeper).collect();
        let mut seen = Vec::new();

        let report = run_jobs(
            &jobs,
            &GroupConfig::default(),
            RunScope::new(None, Duration::from_secs(10)),
            |c| seen.push(c.job.to_string()),
        )
        .await;

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.completed, 4);
        seen.sort();
        assert_eq!(seen, vec!["1s", "2s", "3s", "4s"]);
    }

    #[tokio::test(start_paused = true)]
    async fn job_finishing_on_the_deadline_tick_counts() {
        let jobs: Vec<Job> = (1..=3).map(sleeper).collect();

        let report = run_jobs(
            &jobs,
            &GroupConfig::default(),
            RunScope::new(None, Duration::from_secs(3)),
            |_| {},
        )
        .await;

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.completed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_still_wins_over_slower_jobs() {
        let jobs: Vec<Job> = [1, 3, 4].into_iter().map(sleeper).collect();

        let report = run_jobs(
            &jobs,
            &GroupConfig::default(),
            RunScope::new(None, Duration::from_secs(3)),
            |_| {},
        )
        .await;

        assert_eq!(report.cancel_reason(), Some(CancelReason::DeadlineExceeded));
        assert_eq!(report.completed, 2);
        assert_eq!(report.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_wins_over_pending_completions() {
        let jobs = vec![sleeper(1)];
        let scope = RunScope::new(None, Duration::from_secs(10));
        scope.token().cancel();

        let report = run_jobs(&jobs, &GroupConfig::default(), scope, |_| {}).await;

        assert_eq!(report.status, RunStatus::Cancelled(CancelReason::Cancelled));
        assert_eq!(report.completed, 0);
        assert_eq!(report.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_is_reported_as_such() {
        let parent = CancellationToken::new();
        parent.cancel();
        let jobs = vec![sleeper(1)];

        let report = run_jobs(
            &jobs,
            &GroupConfig::default(),
            RunScope::new(Some(&parent), Duration::from_secs(10)),
            |_| {},
        )
        .await;

        assert_matches!(report.cancel_reason(), Some(CancelReason::ParentCancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn run_token_is_cancelled_but_parent_is_not() {
        let parent = CancellationToken::new();
        let scope = RunScope::new(Some(&parent), Duration::from_secs(10));
        let token = scope.token().clone();

        let report = run_jobs(&[sleeper(1)], &GroupConfig::diagnostic(), scope, |_| {}).await;

        assert!(report.is_complete());
        assert!(token.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_job_still_completes() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let jobs: Vec<Job> = vec![
            Job::new(|| async { panic!("kaboom") }).with_name("bad"),
            Job::new(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        ];
        let mut panics = Vec::new();

        let report = run_jobs(
            &jobs,
            &GroupConfig::default(),
            RunScope::new(None, Duration::from_secs(10)),
            |c| {
                if let Err(msg) = c.outcome {
                    panics.push((c.job.to_string(), msg));
                }
            },
        )
        .await;

        assert!(report.is_complete());
        assert_eq!(report.panicked, 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(panics, vec![("bad".to_string(), "kaboom".to_string())]);
    }
}
