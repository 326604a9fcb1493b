//! Background conversion jobs.
//!
//! Long encodes can take minutes. [`JobRunner`] runs them on the tokio
//! runtime behind a semaphore so callers can poll by [`JobId`] or await with
//! a bounded timeout.

mod config;
mod runner;
mod types;

pub use config::JobsConfig;
pub use runner::JobRunner;
pub use types::{JobError, JobId, JobRecord, JobStatus, RunnerStatus};
