use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// JobName
// ---------------------------------------------------------------------------

const UNKNOWN_JOB: &str = "unknown";

/// Display name of a job, used only for diagnostics.
///
/// Cheap to clone; every completion and failure carries one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobName(Arc<str>);

impl JobName {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        if name.is_empty() {
            Self::unknown()
        } else {
            Self(Arc::from(name))
        }
    }

    pub fn unknown() -> Self {
        Self(Arc::from(UNKNOWN_JOB))
    }

    /// Best-effort name derived from the callable's type.
    ///
    /// Function items resolve to their path (`my_crate::fetch_users`);
    /// closures resolve to the enclosing function. Anything without a
    /// useful path (function pointers, trait objects) is `"unknown"`.
    pub fn of<F: ?Sized>() -> Self {
        Self::from_type_name(std::any::type_name::<F>())
    }

    fn from_type_name(raw: &str) -> Self {
        let mut path = raw;
        while let Some(outer) = path.strip_suffix("::{{closure}}") {
            path = outer;
        }

        if path.is_empty()
            || path.starts_with("fn(")
            || path.starts_with("dyn ")
            || path.starts_with('&')
            || path.starts_with('{')
        {
            return Self::unknown();
        }

        Self::new(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        &*self.0 == UNKNOWN_JOB
    }
}

impl Default for JobName {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for JobName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// Why a run stopped waiting before every job finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The run's deadline elapsed.
    DeadlineExceeded,
    /// The caller-supplied parent token was cancelled.
    ParentCancelled,
    /// The group's own cancel handle was used.
    Cancelled,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DeadlineExceeded => "deadline exceeded",
            Self::ParentCancelled => "parent cancelled",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Terminal state of one run invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every launched job signalled completion.
    Completed,
    /// The coordinator gave up waiting; some jobs may still be running.
    Cancelled(CancelReason),
}

/// What happened during one run invocation.
///
/// `status` tells "all done" apart from "gave up waiting", which a bare
/// absence of failures cannot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this run invocation (UUIDv7, time-ordered).
    pub run_id: Uuid,
    /// When the run started (UTC).
    pub started_at: Timestamp,
    pub status: RunStatus,
    /// Number of jobs launched; always the group's job count.
    pub launched: usize,
    /// Number of completion signals received before the run returned.
    pub completed: usize,
    /// Number of completed jobs that panicked.
    pub panicked: usize,
    /// Deadline the run was bound to, after defaults were applied.
    pub deadline: Duration,
    /// Wall-clock time spent in the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Jobs that had not signalled completion when the run returned.
    pub fn remaining(&self) -> usize {
        self.launched.saturating_sub(self.completed)
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self.status {
            RunStatus::Completed => None,
            RunStatus::Cancelled(reason) => Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_users() {}

    #[test]
    fn name_of_function_item_is_its_path() {
        fn resolve<F: Fn()>(_: &F) -> JobName {
            JobName::of::<F>()
        }
        let name = resolve(&fetch_users);
        assert_eq!(name.as_str(), "funcgroups_core::types::tests::fetch_users");
    }

    #[test]
    fn name_of_closure_is_enclosing_function() {
        fn resolve<F: Fn()>(_: &F) -> JobName {
            JobName::of::<F>()
        }
        let name = resolve(&|| {});
        assert!(
            name.as_str().ends_with("name_of_closure_is_enclosing_function"),
            "got {name}"
        );
    }

    #[test]
    fn name_of_fn_pointer_is_unknown() {
        assert!(JobName::of::<fn()>().is_unknown());
        assert!(JobName::of::<dyn Fn()>().is_unknown());
    }

    #[test]
    fn blank_name_is_unknown() {
        assert!(JobName::new("  ").is_unknown());
        assert_eq!(JobName::default(), JobName::unknown());
        assert_eq!(JobName::from("sync").to_string(), "sync");
    }

    fn report(status: RunStatus, launched: usize, completed: usize) -> RunReport {
        RunReport {
            run_id: Uuid::now_v7(),
            started_at: chrono::Utc::now(),
            status,
            launched,
            completed,
            panicked: 0,
            deadline: Duration::from_secs(10),
            elapsed: Duration::from_secs(1),
        }
    }

    #[test]
    fn remaining_counts_unsignalled_jobs() {
        let r = report(
            RunStatus::Cancelled(CancelReason::DeadlineExceeded),
            5,
            3,
        );
        assert_eq!(r.remaining(), 2);
        assert!(!r.is_complete());
        assert_eq!(r.cancel_reason(), Some(CancelReason::DeadlineExceeded));

        let r = report(RunStatus::Completed, 2, 2);
        assert_eq!(r.remaining(), 0);
        assert!(r.is_complete());
        assert_eq!(r.cancel_reason(), None);
    }

    #[test]
    fn status_serializes_with_reason() {
        let json = serde_json::to_value(RunStatus::Cancelled(CancelReason::ParentCancelled))
            .unwrap();
        assert_eq!(json["state"], "cancelled");
        assert_eq!(json["reason"], "parent_cancelled");

        let json = serde_json::to_value(RunStatus::Completed).unwrap();
        assert_eq!(json["state"], "completed");
    }
}
