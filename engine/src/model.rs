//! Core data model for transfer jobs.
//!
//! This module defines the main data structures for the transfer pipeline:
//! - TransferJob: one requested file transfer (one direction, one file)
//! - TransferResult: the terminal outcome reported for each job
//! - Operation, TransferMode, JobState: enums controlling behavior

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Number of concurrent workers under [`TransferMode::Boost`].
pub const BOOST_WORKERS: usize = 64;

/// Number of concurrent workers under [`TransferMode::Conservative`].
pub const CONSERVATIVE_WORKERS: usize = 2;

/// A single unit of work: move one file in one direction.
///
/// Immutable once created. The queue owns a job while it is pending; a
/// worker takes exclusive ownership when it dequeues it.
#[derive(Debug, Clone)]
pub struct TransferJob {
    /// Unique identifier, used to correlate the job with its result
    pub id: Uuid,

    /// Local file path (source for uploads, destination for downloads)
    pub local_path: PathBuf,

    /// Remote file path on the session's host
    pub remote_path: String,

    /// Direction of the transfer
    pub operation: Operation,

    /// Reference digest for post-download verification.
    ///
    /// When set, the computed checksum is compared against it and a
    /// disagreement is reported as `IntegrityMismatch`. When absent, the
    /// computed digest is attached to the result without comparison.
    pub expected_checksum: Option<String>,
}

impl TransferJob {
    /// Create a new job with a fresh id and no reference checksum.
    pub fn new(
        local_path: impl Into<PathBuf>,
        remote_path: impl Into<String>,
        operation: Operation,
    ) -> Self {
        TransferJob {
            id: Uuid::new_v4(),
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            operation,
            expected_checksum: None,
        }
    }

    /// Attach a reference checksum to verify the download against.
    pub fn with_expected_checksum(mut self, hex: impl Into<String>) -> Self {
        self.expected_checksum = Some(hex.into());
        self
    }
}

/// Direction of a transfer job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Local file to remote host
    Upload,
    /// Remote file to local disk, verified after the durability flush
    Download,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Upload => write!(f, "upload"),
            Operation::Download => write!(f, "download"),
        }
    }
}

/// Named concurrency profile selecting the worker count.
///
/// Selected once at engine construction and immutable for the engine's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// 64 workers; saturate the link
    Boost,
    /// 2 workers; stay out of the way
    Conservative,
}

impl TransferMode {
    /// Parse a mode from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "boost" => Some(Self::Boost),
            "conservative" => Some(Self::Conservative),
            _ => None,
        }
    }

    /// The fixed worker count this mode maps to.
    pub fn worker_count(&self) -> usize {
        match self {
            TransferMode::Boost => BOOST_WORKERS,
            TransferMode::Conservative => CONSERVATIVE_WORKERS,
        }
    }
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferMode::Boost => write!(f, "boost"),
            TransferMode::Conservative => write!(f, "conservative"),
        }
    }
}

/// The state of an individual job.
///
/// `Queued` is only ever observable while the job sits in the queue; the
/// transition to `InFlight` happens atomically with dequeue. Terminal
/// states are reported to the caller and never re-queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting in the queue
    Queued,
    /// Taken by a worker, transfer in progress
    InFlight,
    /// Transfer completed (and, for downloads, the checksum passed)
    Verified,
    /// Transfer or verification failed; see the recorded error
    Failed,
}

impl JobState {
    /// Returns true if this state is terminal (no further changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Verified | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "queued"),
            JobState::InFlight => write!(f, "in-flight"),
            JobState::Verified => write!(f, "verified"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Byte count and wall time reported by a single transfer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    /// Bytes moved across the wire
    pub bytes: u64,

    /// Elapsed wall time for the stream copy
    pub elapsed: Duration,
}

/// Terminal outcome of one job, produced by the engine.
///
/// Every submitted job yields exactly one result; a job is never silently
/// dropped. Results arrive in completion order, which under a concurrent
/// pool need not match dequeue order — correlate by `job_id`.
#[derive(Debug)]
pub struct TransferResult {
    /// Id of the job this result belongs to
    pub job_id: Uuid,

    /// Local path of the job
    pub local_path: PathBuf,

    /// Remote path of the job
    pub remote_path: String,

    /// Direction of the job
    pub operation: Operation,

    /// Terminal state: Verified or Failed
    pub state: JobState,

    /// Bytes transferred before success or failure
    pub bytes_transferred: u64,

    /// Wall time spent in the transfer operation
    pub elapsed: Duration,

    /// Computed digest of the local file (downloads only)
    pub checksum: Option<crate::checksums::ChecksumValue>,

    /// Failure reason when `state` is Failed
    pub error: Option<crate::error::EngineError>,
}

impl TransferResult {
    /// Returns true if the job reached the Verified state.
    pub fn is_verified(&self) -> bool {
        self.state == JobState::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_worker_counts() {
        assert_eq!(TransferMode::Boost.worker_count(), 64);
        assert_eq!(TransferMode::Conservative.worker_count(), 2);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(TransferMode::from_str("boost"), Some(TransferMode::Boost));
        assert_eq!(TransferMode::from_str("BOOST"), Some(TransferMode::Boost));
        assert_eq!(
            TransferMode::from_str("conservative"),
            Some(TransferMode::Conservative)
        );
        assert_eq!(TransferMode::from_str("turbo"), None);
    }

    #[test]
    fn test_job_state_terminal() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::InFlight.is_terminal());
        assert!(JobState::Verified.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn test_job_builder() {
        let job = TransferJob::new("local.bin", "/srv/remote.bin", Operation::Download)
            .with_expected_checksum("3610a686");

        assert_eq!(job.operation, Operation::Download);
        assert_eq!(job.remote_path, "/srv/remote.bin");
        assert_eq!(job.expected_checksum.as_deref(), Some("3610a686"));
    }
}
