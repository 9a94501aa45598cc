//! Stream transfer operations for a single job.
//!
//! Upload and download are symmetric: open one side, create the other,
//! stream-copy in fixed-size chunks, report bytes and elapsed time. Both
//! are blocking from the calling worker's perspective. A download forces a
//! durability flush of the local file before returning, so the checksum
//! verifier only ever sees bytes that are actually on disk.

use crate::error::EngineError;
use crate::model::TransferStats;
use crate::session::RemoteFs;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Chunk size for the stream copy.
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Send a local file to the remote host.
///
/// # Errors
/// `LocalIo` if the local file cannot be opened or read, `RemoteIo` if the
/// remote file cannot be created or written.
pub fn upload_file(
    session: &dyn RemoteFs,
    local_path: &Path,
    remote_path: &str,
) -> Result<TransferStats, EngineError> {
    debug!(local = %local_path.display(), remote = %remote_path, "uploading");
    let start = Instant::now();

    let mut src = File::open(local_path).map_err(|e| EngineError::LocalIo {
        path: local_path.to_path_buf(),
        source: e,
    })?;
    let mut dst = session.create(remote_path)?;

    let mut buffer = [0u8; COPY_BUF_SIZE];
    let mut bytes: u64 = 0;
    loop {
        let n = src.read(&mut buffer).map_err(|e| EngineError::LocalIo {
            path: local_path.to_path_buf(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        dst.write_all(&buffer[..n])
            .map_err(|e| EngineError::RemoteIo {
                path: remote_path.to_string(),
                source: e,
            })?;
        bytes += n as u64;
    }
    dst.flush().map_err(|e| EngineError::RemoteIo {
        path: remote_path.to_string(),
        source: e,
    })?;

    let elapsed = start.elapsed();
    debug!(remote = %remote_path, bytes, ?elapsed, "upload done");
    Ok(TransferStats { bytes, elapsed })
}

/// Pull a remote file to the local disk.
///
/// The local file is flushed to persistent storage (`sync_all`) before
/// this function returns. That ordering is a hard invariant: verification
/// must run against durably-written bytes, never against data still
/// sitting in an OS buffer.
///
/// # Errors
/// `RemoteIo` if the remote file cannot be opened or read, `LocalIo` if
/// the local file cannot be created, written or flushed.
pub fn download_file(
    session: &dyn RemoteFs,
    remote_path: &str,
    local_path: &Path,
) -> Result<TransferStats, EngineError> {
    debug!(remote = %remote_path, local = %local_path.display(), "downloading");
    let start = Instant::now();

    let mut src = session.open(remote_path)?;
    let mut dst = File::create(local_path).map_err(|e| EngineError::LocalIo {
        path: local_path.to_path_buf(),
        source: e,
    })?;

    let mut buffer = [0u8; COPY_BUF_SIZE];
    let mut bytes: u64 = 0;
    loop {
        let n = src.read(&mut buffer).map_err(|e| EngineError::RemoteIo {
            path: remote_path.to_string(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        dst.write_all(&buffer[..n])
            .map_err(|e| EngineError::LocalIo {
                path: local_path.to_path_buf(),
                source: e,
            })?;
        bytes += n as u64;
    }

    dst.sync_all().map_err(|e| EngineError::LocalIo {
        path: local_path.to_path_buf(),
        source: e,
    })?;

    let elapsed = start.elapsed();
    debug!(local = %local_path.display(), bytes, ?elapsed, "download done");
    Ok(TransferStats { bytes, elapsed })
}
