//! Public job groups.
//!
//! [`JobGroup`] runs jobs that cannot fail; [`TryJobGroup`] runs jobs that
//! return `Result<(), E>` and merges every failure into an
//! [`AggregateError`]. Both are built once and can be run any number of
//! times, one run at a time.

use std::fmt;
use std::time::Duration;

use funcgroups_core::{
    AggregateError, GroupConfig, GroupError, JobError, JobFailure, JobName, RunReport,
};
use tokio_util::sync::CancellationToken;

use crate::coordinator::Completion;
use crate::job::{Job, TryJob};
use crate::registry::Registry;

// ---------------------------------------------------------------------------
// JobGroup
// ---------------------------------------------------------------------------

/// A batch of jobs that cannot fail.
pub struct JobGroup {
    registry: Registry<()>,
}

impl JobGroup {
    /// Build a group from `jobs`. `None` config means
    /// [`GroupConfig::default`].
    pub fn new(jobs: impl IntoIterator<Item = Job>, config: Option<GroupConfig>) -> Self {
        Self {
            registry: Registry::new(jobs, config),
        }
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &GroupConfig {
        self.registry.config()
    }

    /// Diagnostic names of the jobs, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &JobName> {
        self.registry.names()
    }

    /// Cancel the run in flight. Returns `false` if nothing is running.
    ///
    /// The run returns promptly; jobs already launched keep running.
    pub fn cancel(&self) -> bool {
        self.registry.cancel()
    }

    pub fn is_running(&self) -> bool {
        self.registry.is_running()
    }

    /// Run every job concurrently and wait until they all finish, the
    /// deadline elapses, or `parent` is cancelled.
    ///
    /// A zero `deadline` means the configured default (10 seconds unless
    /// overridden). Check [`RunReport::status`] to tell a complete run
    /// from one that gave up waiting.
    ///
    /// # Errors
    ///
    /// [`GroupError::RunInFlight`] if another run of this group has not
    /// returned yet.
    pub async fn run(
        &self,
        parent: Option<&CancellationToken>,
        deadline: Duration,
    ) -> Result<RunReport, GroupError> {
        self.registry.run(parent, deadline, |_| {}).await
    }
}

impl fmt::Debug for JobGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobGroup")
            .field("jobs", &self.len())
            .field("config", self.config())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TryJobGroup
// ---------------------------------------------------------------------------

/// Outcome of a [`TryJobGroup`] run.
#[derive(Debug)]
pub struct TryRunReport<E> {
    pub report: RunReport,
    /// Every failure merged before the run returned; `None` if there were
    /// none. After an early return this may be partial.
    pub failure: Option<AggregateError<E>>,
}

impl<E> TryRunReport<E> {
    pub fn is_complete(&self) -> bool {
        self.report.is_complete()
    }

    /// `Ok` when no job failed, whether or not the run completed.
    pub fn into_result(self) -> Result<RunReport, AggregateError<E>> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.report),
        }
    }
}

/// A batch of jobs that report failure through `Err(E)`.
pub struct TryJobGroup<E> {
    registry: Registry<Result<(), E>>,
}

impl<E> TryJobGroup<E>
where
    E: fmt::Display + Send + 'static,
{
    /// Build a group from `jobs`. `None` config means
    /// [`GroupConfig::default`].
    pub fn new(jobs: impl IntoIterator<Item = TryJob<E>>, config: Option<GroupConfig>) -> Self {
        Self {
            registry: Registry::new(jobs, config),
        }
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &GroupConfig {
        self.registry.config()
    }

    pub fn names(&self) -> impl Iterator<Item = &JobName> {
        self.registry.names()
    }

    /// Cancel the run in flight. Returns `false` if nothing is running.
    pub fn cancel(&self) -> bool {
        self.registry.cancel()
    }

    pub fn is_running(&self) -> bool {
        self.registry.is_running()
    }

    /// Run every job concurrently, collecting failures.
    ///
    /// Same waiting rules as [`JobGroup::run`]. Failures are merged on the
    /// coordinator as completions arrive, so a job that fails after the
    /// run returned is not part of the aggregate.
    ///
    /// # Errors
    ///
    /// [`GroupError::RunInFlight`] if another run of this group has not
    /// returned yet.
    pub async fn run(
        &self,
        parent: Option<&CancellationToken>,
        deadline: Duration,
    ) -> Result<TryRunReport<E>, GroupError> {
        let mut failure = None;
        let report = self
            .registry
            .run(parent, deadline, |completion| merge(&mut failure, completion))
            .await?;

        Ok(finish(self.config(), report, failure))
    }
}

impl<E> fmt::Debug for TryJobGroup<E>
where
    E: fmt::Display + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryJobGroup")
            .field("jobs", &self.len())
            .field("config", self.config())
            .finish()
    }
}

/// Fold one completion into the aggregate. Successes leave it untouched.
fn merge<E>(aggregate: &mut Option<AggregateError<E>>, completion: Completion<Result<(), E>>) {
    let error = match completion.outcome {
        Ok(Ok(())) => return,
        Ok(Err(err)) => JobError::Failed(err),
        Err(panic) => JobError::Panicked(panic),
    };

    *aggregate = Some(AggregateError::join(
        aggregate.take(),
        JobFailure {
            job: completion.job,
            error,
        },
    ));
}

fn finish<E: fmt::Display>(
    config: &GroupConfig,
    report: RunReport,
    failure: Option<AggregateError<E>>,
) -> TryRunReport<E> {
    if let Some(failure) = &failure {
        if config.diagnostic {
            tracing::warn!(
                run_id = %report.run_id,
                failures = failure.len(),
                "Errors encountered: {failure}",
            );
        } else {
            tracing::debug!(
                run_id = %report.run_id,
                failures = failure.len(),
                "Errors encountered",
            );
        }
    }

    TryRunReport { report, failure }
}

// ---------------------------------------------------------------------------
// One-shot helpers
// ---------------------------------------------------------------------------

/// Build a [`JobGroup`] and run it once under `parent` with the
/// configured default deadline.
pub async fn run_wait(
    jobs: impl IntoIterator<Item = Job>,
    parent: Option<&CancellationToken>,
    config: Option<GroupConfig>,
) -> RunReport {
    Registry::new(jobs, config).run_once(parent, |_| {}).await
}

/// Build a [`TryJobGroup`] and run it once under `parent` with the
/// configured default deadline.
pub async fn run_wait_err<E>(
    jobs: impl IntoIterator<Item = TryJob<E>>,
    parent: Option<&CancellationToken>,
    config: Option<GroupConfig>,
) -> TryRunReport<E>
where
    E: fmt::Display + Send + 'static,
{
    let registry = Registry::new(jobs, config);
    let config = registry.config().clone();

    let mut failure = None;
    let report = registry
        .run_once(parent, |completion| merge(&mut failure, completion))
        .await;

    finish(&config, report, failure)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use funcgroups_core::RunStatus;

    use super::*;

    fn completion(
        job: &str,
        outcome: Result<Result<(), String>, String>,
    ) -> Completion<Result<(), String>> {
        Completion {
            job: JobName::new(job),
            outcome,
        }
    }

    fn completed_report() -> RunReport {
        RunReport {
            run_id: uuid::Uuid::now_v7(),
            started_at: chrono::Utc::now(),
            status: RunStatus::Completed,
            launched: 1,
            completed: 1,
            panicked: 0,
            deadline: Duration::from_secs(10),
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn merge_ignores_success() {
        let mut agg: Option<AggregateError<String>> = None;
        merge(&mut agg, completion("ok", Ok(Ok(()))));
        assert!(agg.is_none());
    }

    #[test]
    fn merge_collects_failures_and_panics() {
        let mut agg = None;
        merge(&mut agg, completion("a", Ok(Err("e1".into()))));
        merge(&mut agg, completion("b", Ok(Ok(()))));
        merge(&mut agg, completion("c", Err("boom".into())));

        let agg = agg.expect("two failures were merged");
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.panic_count(), 1);
        assert_eq!(agg.errors().collect::<Vec<_>>(), vec!["e1"]);
    }

    #[test]
    fn into_result_maps_absence_to_ok() {
        let ok: TryRunReport<String> = TryRunReport {
            report: completed_report(),
            failure: None,
        };
        assert!(ok.is_complete());
        assert!(ok.into_result().is_ok());

        let mut agg = None;
        merge(&mut agg, completion("a", Ok(Err("e1".into()))));
        let failed = TryRunReport {
            report: completed_report(),
            failure: agg,
        };
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.to_string(), "a: e1");
    }

    #[test]
    fn debug_shows_job_count_and_config() {
        let group: TryJobGroup<String> = TryJobGroup::new(Vec::new(), None);
        assert!(group.is_empty());
        assert_eq!(
            format!("{group:?}"),
            format!(
                "TryJobGroup {{ jobs: 0, config: {:?} }}",
                GroupConfig::default()
            )
        );
    }
}
