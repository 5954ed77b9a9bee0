//! Job registry shared by both group flavours.
//!
//! Holds the jobs and configuration fixed at construction, plus the one
//! piece of runtime state: the cancellation token of the run in flight.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use funcgroups_core::{GroupConfig, GroupError, JobName, RunReport};
use tokio_util::sync::CancellationToken;

use crate::coordinator::{self, Completion, RunScope};
use crate::job::Job;

// ---------------------------------------------------------------------------
// RunSlot
// ---------------------------------------------------------------------------

/// Token of the run currently in flight, if any.
///
/// Enforces at most one run per registry at a time.
#[derive(Debug, Default)]
struct RunSlot {
    active: Mutex<Option<CancellationToken>>,
}

impl RunSlot {
    fn lock(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self, token: CancellationToken) -> Result<RunGuard<'_>, GroupError> {
        let mut active = self.lock();
        if active.is_some() {
            return Err(GroupError::RunInFlight);
        }
        *active = Some(token);
        Ok(RunGuard { slot: self })
    }

    fn cancel(&self) -> bool {
        match self.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn is_running(&self) -> bool {
        self.lock().is_some()
    }
}

/// Clears the slot when the run ends, including when the run future is
/// dropped before completing.
#[derive(Debug)]
struct RunGuard<'a> {
    slot: &'a RunSlot,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub(crate) struct Registry<T> {
    jobs: Vec<Job<T>>,
    config: GroupConfig,
    slot: RunSlot,
}

impl<T: Send + 'static> Registry<T> {
    pub(crate) fn new(jobs: impl IntoIterator<Item = Job<T>>, config: Option<GroupConfig>) -> Self {
        Self {
            jobs: jobs.into_iter().collect(),
            config: config.unwrap_or_default(),
            slot: RunSlot::default(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn config(&self) -> &GroupConfig {
        &self.config
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &JobName> {
        self.jobs.iter().map(Job::name)
    }

    pub(crate) fn cancel(&self) -> bool {
        self.slot.cancel()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.slot.is_running()
    }

    /// Run every job once, holding the run slot for the duration.
    pub(crate) async fn run<F>(
        &self,
        parent: Option<&CancellationToken>,
        deadline: Duration,
        on_complete: F,
    ) -> Result<RunReport, GroupError>
    where
        F: FnMut(Completion<T>),
    {
        let scope = RunScope::new(parent, self.config.effective_deadline(deadline));
        let _guard = self.slot.acquire(scope.token().clone())?;
        Ok(coordinator::run_jobs(&self.jobs, &self.config, scope, on_complete).await)
    }

    /// Run every job once with the default deadline, without touching the
    /// run slot.
    ///
    /// Only for registries that are never shared, such as the one built
    /// by the one-shot helpers.
    pub(crate) async fn run_once<F>(
        self,
        parent: Option<&CancellationToken>,
        on_complete: F,
    ) -> RunReport
    where
        F: FnMut(Completion<T>),
    {
        let scope = RunScope::new(parent, self.config.default_deadline());
        coordinator::run_jobs(&self.jobs, &self.config, scope, on_complete).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
