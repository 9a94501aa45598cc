//! Transfer engine: owns the job queue, sizes the worker pool from the
//! transfer mode, and drains the queue against a remote session.
//!
//! Workers pull jobs independently; each job is processed synchronously
//! within its worker (transfer, then verification for downloads). Dequeue
//! order is FIFO but completion order is not — a later job on a faster
//! worker may finish first. Per-job failures are recorded in that job's
//! result and never abort the run; the one fatal precondition (no open
//! file-transfer subsystem) is checked once before any job is dispatched.

use crate::checksums::{self, ChecksumValue};
use crate::error::EngineError;
use crate::model::{JobState, Operation, TransferJob, TransferMode, TransferResult, TransferStats};
use crate::queue::JobQueue;
use crate::session::RemoteFs;
use crate::transfer;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The transfer pipeline: a job queue drained by a sized worker pool.
///
/// The mode is fixed at construction. Jobs are submitted with
/// [`Engine::add`] or [`Engine::submit`] and processed by
/// [`Engine::start_transfer`], which returns one terminal result per job.
pub struct Engine {
    mode: TransferMode,
    workers: usize,
    queue: JobQueue,
    stop: Arc<AtomicBool>,
}

impl Engine {
    /// Create an engine whose worker count is derived from `mode`.
    pub fn new(mode: TransferMode) -> Self {
        Self::with_worker_count(mode, mode.worker_count())
    }

    /// Create an engine with an explicit worker count, overriding the
    /// mode's mapping. Intended for tests and embedders that know better.
    pub fn with_worker_count(mode: TransferMode, workers: usize) -> Self {
        Engine {
            mode,
            workers: workers.max(1),
            queue: JobQueue::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The mode this engine was constructed with.
    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// The worker count this engine will run with.
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Queue a transfer and return the id of the created job.
    pub fn add(
        &self,
        local_path: impl Into<PathBuf>,
        remote_path: impl Into<String>,
        operation: Operation,
    ) -> Uuid {
        let job = TransferJob::new(local_path, remote_path, operation);
        let id = job.id;
        self.queue.add(job);
        id
    }

    /// Queue a pre-built job (e.g. one carrying an expected checksum).
    pub fn submit(&self, job: TransferJob) {
        self.queue.add(job);
    }

    /// Pending queue depth. Advisory; see [`JobQueue::count`].
    pub fn count(&self) -> usize {
        self.queue.count()
    }

    /// Handle for requesting a stop. Workers check it before popping their
    /// next job; an in-flight transfer always runs to completion or
    /// failure.
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Drain the queue against `session` and return one terminal result
    /// per processed job.
    ///
    /// Returns immediately with an empty result set if no jobs are queued.
    ///
    /// # Errors
    /// `SubsystemUnavailable` if the session has no open file-transfer
    /// subsystem; the check runs once up front and leaves the queue
    /// untouched. All other errors are per-job and land in the results.
    pub fn start_transfer(
        &self,
        session: &dyn RemoteFs,
    ) -> Result<Vec<TransferResult>, EngineError> {
        session.ensure_ready()?;

        let pending = self.queue.count();
        if pending == 0 {
            return Ok(Vec::new());
        }

        // No point spinning up more workers than there are jobs.
        let workers = self.workers.min(pending);
        info!(mode = %self.mode, workers, pending, "transfer engine started");

        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                scope.spawn(move || loop {
                    if self.stop.load(Ordering::SeqCst) {
                        debug!("stop requested, worker exiting");
                        break;
                    }
                    let Some(job) = self.queue.pop() else {
                        break;
                    };
                    if tx.send(process_job(session, job)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let results: Vec<TransferResult> = rx.into_iter().collect();
        let failed = results.iter().filter(|r| !r.is_verified()).count();
        info!(
            completed = results.len(),
            failed, "transfer engine finished"
        );
        Ok(results)
    }
}

/// Run one dequeued job to a terminal state. Never panics a worker: every
/// failure path is folded into the returned result.
fn process_job(session: &dyn RemoteFs, job: TransferJob) -> TransferResult {
    debug!(job_id = %job.id, operation = %job.operation, remote = %job.remote_path, "job in flight");

    let outcome = match job.operation {
        Operation::Upload => transfer::upload_file(session, &job.local_path, &job.remote_path),
        Operation::Download => transfer::download_file(session, &job.remote_path, &job.local_path),
    };

    let stats = match outcome {
        Ok(stats) => stats,
        Err(e) => {
            warn!(job_id = %job.id, error = %e, "transfer failed");
            return finish(job, JobState::Failed, None, None, Some(e));
        }
    };

    if job.operation == Operation::Upload {
        return finish(job, JobState::Verified, Some(stats), None, None);
    }

    // Download completed and durably flushed; verify what is on disk.
    let actual = match checksums::compute_file_checksum(&job.local_path) {
        Ok(actual) => actual,
        Err(e) => {
            warn!(job_id = %job.id, error = %e, "checksum computation failed");
            return finish(job, JobState::Failed, Some(stats), None, Some(e));
        }
    };

    if let Some(expected) = job.expected_checksum.as_deref() {
        if !actual.matches(expected) {
            let err = EngineError::IntegrityMismatch {
                path: job.local_path.clone(),
                expected: expected.trim().to_ascii_lowercase(),
                actual: actual.hex().to_string(),
            };
            warn!(job_id = %job.id, error = %err, "integrity check failed");
            return finish(job, JobState::Failed, Some(stats), Some(actual), Some(err));
        }
    }

    debug!(job_id = %job.id, checksum = %actual, "job verified");
    finish(job, JobState::Verified, Some(stats), Some(actual), None)
}

fn finish(
    job: TransferJob,
    state: JobState,
    stats: Option<TransferStats>,
    checksum: Option<ChecksumValue>,
    error: Option<EngineError>,
) -> TransferResult {
    let stats = stats.unwrap_or(TransferStats {
        bytes: 0,
        elapsed: Duration::ZERO,
    });
    TransferResult {
        job_id: job.id,
        local_path: job.local_path,
        remote_path: job.remote_path,
        operation: job.operation,
        state,
        bytes_transferred: stats.bytes,
        elapsed: stats.elapsed,
        checksum,
        error,
    }
}
