use std::fmt;

use crate::types::JobName;

/// Errors raised by the group itself, as opposed to by its jobs.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("A run is already in flight for this job group")]
    RunInFlight,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Why a single job did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum JobError<E> {
    /// The job returned an error.
    #[error("{0}")]
    Failed(E),
    /// The job panicked; the payload message is kept when it is a string.
    #[error("job panicked: {0}")]
    Panicked(String),
}

impl<E> JobError<E> {
    /// The job's own error, if it returned one.
    pub fn as_failed(&self) -> Option<&E> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Panicked(_) => None,
        }
    }
}

/// One failed job, tagged with its resolved name.
#[derive(Debug)]
pub struct JobFailure<E> {
    pub job: JobName,
    pub error: JobError<E>,
}

impl<E: fmt::Display> fmt::Display for JobFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.job, self.error)
    }
}

/// Every job failure observed during one run.
///
/// Never empty: "no failures" is represented by the absence of an
/// aggregate (`None`), and the only way to build one is
/// [`join`](Self::join), which always adds a failure.
#[derive(Debug)]
pub struct AggregateError<E> {
    failures: Vec<JobFailure<E>>,
}

impl<E> AggregateError<E> {
    /// Merge `failure` into an existing aggregate, or start a new one.
    ///
    /// Nothing is ever dropped; the merge order only affects how the
    /// aggregate is displayed.
    pub fn join(aggregate: Option<Self>, failure: JobFailure<E>) -> Self {
        let mut aggregate = aggregate.unwrap_or(Self {
            failures: Vec::new(),
        });
        aggregate.failures.push(failure);
        aggregate
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// All failures in merge order.
    pub fn failures(&self) -> &[JobFailure<E>] {
        &self.failures
    }

    /// Errors returned by jobs, skipping panics.
    pub fn errors(&self) -> impl Iterator<Item = &E> {
        self.failures.iter().filter_map(|f| f.error.as_failed())
    }

    /// Number of jobs that panicked rather than returning an error.
    pub fn panic_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f.error, JobError::Panicked(_)))
            .count()
    }

    pub fn into_failures(self) -> Vec<JobFailure<E>> {
        self.failures
    }
}

impl<E: fmt::Display> fmt::Display for AggregateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AggregateError<E> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(job: &str, msg: &str) -> JobFailure<String> {
        JobFailure {
            job: JobName::new(job),
            error: JobError::Failed(msg.to_string()),
        }
    }

    #[test]
    fn join_starts_from_absence() {
        let agg = AggregateError::join(None, failed("a", "boom"));
        assert_eq!(agg.len(), 1);
        assert!(!agg.is_empty());
        assert_eq!(agg.to_string(), "a: boom");
    }

    #[test]
    fn join_keeps_every_failure() {
        let agg = AggregateError::join(None, failed("a", "e1"));
        let agg = AggregateError::join(Some(agg), failed("c", "e2"));
        let agg = AggregateError::join(
            Some(agg),
            JobFailure {
                job: JobName::new("d"),
                error: JobError::Panicked("oops".into()),
            },
        );

        assert_eq!(agg.len(), 3);
        assert_eq!(agg.panic_count(), 1);
        let errors: Vec<&String> = agg.errors().collect();
        assert_eq!(errors, vec!["e1", "e2"]);
        assert_eq!(agg.to_string(), "a: e1\nc: e2\nd: job panicked: oops");
    }

    #[test]
    fn display_group_error() {
        assert_eq!(
            GroupError::RunInFlight.to_string(),
            "A run is already in flight for this job group"
        );
    }

    #[test]
    fn display_config_error() {
        let err = ConfigError::InvalidValue {
            var: "FUNCGROUPS_DIAGNOSTIC",
            value: "maybe".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for FUNCGROUPS_DIAGNOSTIC: \"maybe\""
        );
    }
}
