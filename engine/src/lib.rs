//! # FileRipper Engine - Parallel File Transfer Library
//!
//! A headless SFTP transfer engine: a thread-safe FIFO job queue drained
//! by a fixed-size worker pool, with post-download integrity checking.
//!
//! ## Overview
//!
//! Callers queue upload/download jobs, pick a transfer mode (which fixes
//! the worker count), and run the pipeline against an open session. Every
//! submitted job comes back with a definite terminal outcome: verified, or
//! failed with a specific reason. Downloads are flushed to disk and then
//! checksummed (CRC32, corruption detection only — not tamper evidence).
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{Engine, Operation, SftpSession, TransferMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SftpSession::connect("files.example.com", 22, "deploy", "secret")?;
//! session.open_subsystem()?;
//!
//! let engine = Engine::new(TransferMode::Conservative);
//! engine.add("report.csv", "/srv/drop/report.csv", Operation::Upload);
//! engine.add("backup.tar", "/srv/drop/backup.tar", Operation::Download);
//!
//! let results = engine.start_transfer(&session)?;
//! for result in &results {
//!     println!("{} {}: {}", result.operation, result.remote_path, result.state);
//! }
//! session.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (TransferJob, TransferResult, enums)
//! - **error**: Error types and handling
//! - **queue**: Thread-safe FIFO job queue
//! - **checksums**: Streaming CRC32 verification
//! - **transfer**: Upload/download stream operations
//! - **session**: RemoteFs capability trait and the ssh2-backed session
//! - **engine**: The worker pool draining the queue

pub mod checksums;
pub mod engine;
pub mod error;
pub mod model;
pub mod queue;
pub mod session;
pub mod transfer;

// Re-export main types and functions
pub use checksums::{compute_file_checksum, ChecksumValue};
pub use engine::Engine;
pub use error::EngineError;
pub use model::{
    JobState, Operation, TransferJob, TransferMode, TransferResult, TransferStats,
    BOOST_WORKERS, CONSERVATIVE_WORKERS,
};
pub use queue::JobQueue;
pub use session::{RemoteEntry, RemoteFs, SftpSession};
pub use transfer::{download_file, upload_file};
