//! Run a batch of independent jobs concurrently and wait for all of them,
//! a deadline, or cancellation, whichever comes first.
//!
//! - [`JobGroup`] — jobs that cannot fail.
//! - [`TryJobGroup`] — jobs returning `Result<(), E>`; failures are merged
//!   into one [`AggregateError`].
//! - [`run_wait`] / [`run_wait_err`] — one-shot helpers that build a group
//!   and run it once with the configured default deadline.
//!
//! Every job gets its own Tokio task. Cancellation and deadlines stop the
//! group from *waiting*; they never interrupt a job that is already
//! running.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use funcgroups::{Job, JobGroup};
//!
//! # async fn demo() -> Result<(), funcgroups::GroupError> {
//! let group = JobGroup::new(
//!     [
//!         Job::new(|| async { tokio::time::sleep(Duration::from_secs(1)).await }),
//!         Job::blocking(|| std::thread::sleep(Duration::from_secs(2))).with_name("sync"),
//!     ],
//!     None,
//! );
//!
//! let report = group.run(None, Duration::from_secs(3)).await?;
//! assert!(report.is_complete());
//! # Ok(())
//! # }
//! ```

mod coordinator;
pub mod group;
pub mod job;
mod registry;
mod timing;

pub use funcgroups_core::{
    AggregateError, CancelReason, ConfigError, GroupConfig, GroupError, JobError, JobFailure,
    JobName, RunReport, RunStatus,
};
pub use group::{run_wait, run_wait_err, JobGroup, TryJobGroup, TryRunReport};
pub use job::{Job, TryJob};
pub use tokio_util::sync::CancellationToken;
