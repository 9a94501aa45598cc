//! Error types for the transfer engine.
//!
//! The primary error type is `EngineError`. Per-job errors (local I/O,
//! remote I/O, integrity mismatch) are recovered at the worker boundary and
//! recorded in the job's TransferResult; they never unwind past the worker.
//! `SubsystemUnavailable` is the one fatal precondition — it is checked
//! once before any job is dispatched and aborts the whole run.

use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;

/// Errors produced by the transfer pipeline.
///
/// A closed set: callers can match exhaustively to tell "bytes moved but
/// are wrong" (`IntegrityMismatch`) from "bytes never arrived"
/// (`RemoteIo`/`LocalIo`). An empty queue is not an error; the queue
/// reports it with `None`.
#[derive(Debug)]
pub enum EngineError {
    /// The session has no active file-transfer subsystem; fatal for the run
    SubsystemUnavailable,

    /// TCP dial or SSH handshake with the remote host failed
    ConnectionFailed { host: String, source: io::Error },

    /// The remote host rejected our credentials
    AuthFailed { host: String, user: String },

    /// Local open/create/read/write/flush failure; scoped to one job
    LocalIo { path: PathBuf, source: io::Error },

    /// Remote open/create/stream failure; scoped to one job
    RemoteIo { path: String, source: io::Error },

    /// Computed checksum disagrees with the reference value
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubsystemUnavailable => {
                write!(f, "Session has no open file-transfer subsystem")
            }
            Self::ConnectionFailed { host, source } => {
                write!(f, "Failed to connect to {}: {}", host, source)
            }
            Self::AuthFailed { host, user } => {
                write!(f, "Authentication failed for {}@{}", user, host)
            }
            Self::LocalIo { path, source } => {
                write!(f, "Local I/O error on {}: {}", path.display(), source)
            }
            Self::RemoteIo { path, source } => {
                write!(f, "Remote I/O error on {}: {}", path, source)
            }
            Self::IntegrityMismatch {
                path,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Integrity mismatch for {}: expected {}, got {}",
                    path.display(),
                    expected,
                    actual
                )
            }
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConnectionFailed { source, .. }
            | Self::LocalIo { source, .. }
            | Self::RemoteIo { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl EngineError {
    /// Stable machine-readable classification of this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SubsystemUnavailable => "subsystem_unavailable",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::AuthFailed { .. } => "auth_failed",
            Self::LocalIo { .. } => "local_io",
            Self::RemoteIo { .. } => "remote_io",
            Self::IntegrityMismatch { .. } => "integrity_mismatch",
        }
    }
}
