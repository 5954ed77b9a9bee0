//! Shared types for the `funcgroups` workspace.
//!
//! Holds everything a caller needs to configure a job group and to
//! interpret the outcome of a run, with no dependency on the async
//! runtime:
//!
//! - [`GroupConfig`] — group-wide configuration (diagnostic mode,
//!   default deadline).
//! - [`RunReport`] / [`RunStatus`] — what happened during one run.
//! - [`AggregateError`] — every job failure collected during one run.

pub mod config;
pub mod error;
pub mod types;

pub use config::GroupConfig;
pub use error::{AggregateError, ConfigError, GroupError, JobError, JobFailure};
pub use types::{CancelReason, JobName, RunReport, RunStatus, Timestamp};
