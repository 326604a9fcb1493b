//! Types for background conversion jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::dispatcher::ConversionOutcome;

/// Identifier of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| JobError::NotFound(s.to_string()))
    }
}

/// Lifecycle of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker slot.
    Queued,
    Running,
    Finished { outcome: ConversionOutcome },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

/// A job as reported to pollers.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub request_id: String,
    /// File name of the destination, without directories.
    pub output_name: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Snapshot of runner load.
#[derive(Debug, Clone, Serialize)]
pub struct RunnerStatus {
    pub max_parallel: usize,
    pub active_jobs: usize,
    pub queued_jobs: usize,
    pub total_finished: u64,
    pub total_failed: u64,
}

/// Errors from the job runner.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The caller stopped waiting. The job itself keeps running.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The conversion task panicked or was aborted.
    #[error("Conversion task failed: {0}")]
    TaskFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_roundtrip() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_invalid_job_id_is_not_found() {
        let err = "nope".parse::<JobId>().unwrap_err();
        assert_eq!(err, JobError::NotFound("nope".to_string()));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(JobStatus::Queued).unwrap();
        assert_eq!(json["state"], "queued");

        let status = JobStatus::Finished {
            outcome: ConversionOutcome::failed("boom"),
        };
        assert!(status.is_finished());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "finished");
        assert_eq!(json["outcome"]["success"], false);
        assert_eq!(json["outcome"]["message"], "boom");
    }

    #[test]
    fn test_timeout_message() {
        let err = JobError::Timeout { timeout_secs: 300 };
        assert_eq!(err.to_string(), "Conversion timed out after 300 seconds");
    }
}
