//! Bounded pool of background conversions.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

use crate::dispatcher::{ConversionOutcome, Dispatcher};
use crate::events::{ConversionEvent, EventSink};
use crate::metrics;
use crate::request::ConversionRequest;

use super::config::JobsConfig;
use super::types::{JobError, JobId, JobRecord, JobStatus, RunnerStatus};

/// Tracks statistics for the worker pool.
#[derive(Default)]
struct PoolStats {
    active: AtomicUsize,
    queued: AtomicUsize,
    total_finished: AtomicU64,
    total_failed: AtomicU64,
}

#[derive(Default)]
struct JobTable {
    records: HashMap<JobId, JobRecord>,
    /// Submission order, oldest first.
    order: VecDeque<JobId>,
}

impl JobTable {
    /// Drops the oldest finished records beyond `limit`.
    fn prune(&mut self, limit: usize) {
        let mut finished = self
            .order
            .iter()
            .filter(|id| {
                self.records
                    .get(*id)
                    .is_some_and(|r| r.status.is_finished())
            })
            .count();

        while finished > limit {
            let Some(pos) = self.order.iter().position(|id| {
                self.records
                    .get(id)
                    .is_some_and(|r| r.status.is_finished())
            }) else {
                break;
            };
            if let Some(id) = self.order.remove(pos) {
                self.records.remove(&id);
            }
            finished -= 1;
        }
    }
}

/// Runs conversions in the background with a parallelism limit.
///
/// Callers either poll with [`JobRunner::status`] or await a result with
/// [`JobRunner::run`], which gives up after the configured timeout. Giving up
/// does not cancel the conversion; its record is still updated when it ends.
#[derive(Clone)]
pub struct JobRunner {
    config: JobsConfig,
    dispatcher: Arc<Dispatcher>,
    sink: Arc<dyn EventSink>,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
    jobs: Arc<RwLock<JobTable>>,
}

impl JobRunner {
    pub fn new(config: JobsConfig, dispatcher: Arc<Dispatcher>, sink: Arc<dyn EventSink>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel.max(1)));
        Self {
            config,
            dispatcher,
            sink,
            semaphore,
            stats: Arc::new(PoolStats::default()),
            jobs: Arc::new(RwLock::new(JobTable::default())),
        }
    }

    pub fn config(&self) -> &JobsConfig {
        &self.config
    }

    /// Queues a conversion and returns its id immediately.
    pub async fn submit(&self, request: ConversionRequest) -> JobId {
        self.spawn(request).await.0
    }

    /// Submits a conversion and waits for it, up to the configured timeout.
    pub async fn run(&self, request: ConversionRequest) -> Result<ConversionOutcome, JobError> {
        self.run_with_timeout(request, Duration::from_secs(self.config.timeout_secs))
            .await
    }

    /// Like [`JobRunner::run`] with an explicit timeout.
    pub async fn run_with_timeout(
        &self,
        request: ConversionRequest,
        limit: Duration,
    ) -> Result<ConversionOutcome, JobError> {
        let (job_id, handle) = self.spawn(request).await;

        match timeout(limit, handle).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(JobError::TaskFailed(e.to_string())),
            Err(_) => {
                // Dropping the handle detaches the task; it keeps running.
                let timeout_secs = limit.as_secs();
                tracing::warn!(%job_id, timeout_secs, "Stopped waiting for conversion");
                metrics::JOBS_TIMED_OUT.inc();
                self.sink.record(ConversionEvent::JobTimedOut {
                    job_id: job_id.to_string(),
                    timeout_secs,
                });
                Err(JobError::Timeout { timeout_secs })
            }
        }
    }

    /// Current record of a job.
    pub async fn status(&self, job_id: &JobId) -> Result<JobRecord, JobError> {
        self.jobs
            .read()
            .await
            .records
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Snapshot of pool load.
    pub fn pool_status(&self) -> RunnerStatus {
        RunnerStatus {
            max_parallel: self.config.max_parallel.max(1),
            active_jobs: self.stats.active.load(Ordering::Relaxed),
            queued_jobs: self.stats.queued.load(Ordering::Relaxed),
            total_finished: self.stats.total_finished.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
        }
    }

    async fn spawn(&self, request: ConversionRequest) -> (JobId, JoinHandle<ConversionOutcome>) {
        let job_id = JobId::new();
        {
            let mut jobs = self.jobs.write().await;
            jobs.records.insert(
                job_id,
                JobRecord {
                    id: job_id,
                    request_id: request.id.clone(),
                    output_name: request
                        .destination
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    status: JobStatus::Queued,
                    submitted_at: Utc::now(),
                    finished_at: None,
                },
            );
            jobs.order.push_back(job_id);
        }

        tracing::debug!(%job_id, request_id = %request.id, "Job submitted");
        metrics::JOBS_SUBMITTED.inc();
        self.sink.record(ConversionEvent::JobSubmitted {
            job_id: job_id.to_string(),
            request_id: request.id.clone(),
        });

        let dispatcher = Arc::clone(&self.dispatcher);
        let semaphore = Arc::clone(&self.semaphore);
        let stats = Arc::clone(&self.stats);
        let jobs = Arc::clone(&self.jobs);
        let history_limit = self.config.history_limit;

        stats.queued.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(async move {
            let permit = semaphore.acquire_owned().await;
            stats.queued.fetch_sub(1, Ordering::Relaxed);

            let outcome = match permit {
                Ok(_permit) => {
                    stats.active.fetch_add(1, Ordering::Relaxed);
                    metrics::JOBS_ACTIVE.inc();
                    Self::set_status(&jobs, &job_id, JobStatus::Running).await;

                    let outcome = dispatcher.dispatch(&request).await;

                    stats.active.fetch_sub(1, Ordering::Relaxed);
                    metrics::JOBS_ACTIVE.dec();
                    outcome
                }
                Err(_) => ConversionOutcome::failed("Job runner is shut down"),
            };

            if request.cleanup_source {
                if let Err(e) = tokio::fs::remove_file(&request.source).await {
                    tracing::debug!(
                        %job_id,
                        path = %request.source.display(),
                        error = %e,
                        "Failed to remove source"
                    );
                }
            }

            stats.total_finished.fetch_add(1, Ordering::Relaxed);
            if !outcome.success {
                stats.total_failed.fetch_add(1, Ordering::Relaxed);
            }

            {
                let mut table = jobs.write().await;
                if let Some(record) = table.records.get_mut(&job_id) {
                    record.status = JobStatus::Finished {
                        outcome: outcome.clone(),
                    };
                    record.finished_at = Some(Utc::now());
                }
                table.prune(history_limit);
            }

            outcome
        });

        (job_id, handle)
    }

    async fn set_status(jobs: &RwLock<JobTable>, job_id: &JobId, status: JobStatus) {
        if let Some(record) = jobs.write().await.records.get_mut(job_id) {
            record.status = status;
        }
    }
}
