//! Remote session surface and its SFTP implementation.
//!
//! The engine depends on [`RemoteFs`], a narrow capability trait: open a
//! remote path for reading, create one for writing, and (for discovery
//! callers) list or stat entries. [`SftpSession`] implements it over an
//! ssh2 session; tests use an in-memory implementation.
//!
//! libssh2 does not allow concurrent I/O on one session, so the adapter
//! serializes every wire operation through a shared lock. Local file I/O
//! and checksumming still run in parallel across workers.

use crate::error::EngineError;
use serde::Serialize;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// One remote directory entry as reported by `read_dir`/`stat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEntry {
    /// Entry name (final path component)
    pub name: String,

    /// Size in bytes (0 for directories or when the server omits it)
    pub size: u64,

    /// True if the entry is a directory
    pub is_dir: bool,
}

/// Capability surface the transfer core requires from a remote session.
///
/// Implementations must tolerate concurrent calls from many worker
/// threads; if the underlying transport cannot, the implementation has to
/// serialize internally.
pub trait RemoteFs: Sync {
    /// Check the fatal precondition: is the file-transfer subsystem open?
    ///
    /// The engine calls this once before dispatching any job.
    fn ensure_ready(&self) -> Result<(), EngineError>;

    /// Open a remote path for reading.
    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, EngineError>;

    /// Create (or truncate) a remote path for writing.
    fn create(&self, path: &str) -> Result<Box<dyn Write + '_>, EngineError>;

    /// The session's working directory.
    fn getwd(&self) -> Result<String, EngineError>;

    /// List the entries of a remote directory.
    fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, EngineError>;

    /// Stat a single remote path.
    fn stat(&self, path: &str) -> Result<RemoteEntry, EngineError>;
}

fn io_err(e: ssh2::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

fn remote_err(path: &str, e: ssh2::Error) -> EngineError {
    EngineError::RemoteIo {
        path: path.to_string(),
        source: io_err(e),
    }
}

/// An SSH connection with an optionally-open SFTP subsystem.
///
/// Connecting and opening SFTP are distinct steps, mirroring the protocol:
/// a session can carry a shell without ever touching files. `close` is
/// idempotent and safe to call from any state.
pub struct SftpSession {
    host: String,
    user: String,
    sess: Mutex<Option<ssh2::Session>>,
    sftp: Mutex<Option<ssh2::Sftp>>,
    wire_lock: Arc<Mutex<()>>,
}

impl SftpSession {
    /// Dial the host, perform the SSH handshake and authenticate with a
    /// password. The SFTP subsystem is NOT opened yet; call
    /// [`SftpSession::open_subsystem`] before transferring files.
    ///
    /// # Errors
    /// `ConnectionFailed` for dial/handshake failures, `AuthFailed` when
    /// the credentials are rejected.
    pub fn connect(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
    ) -> Result<Self, EngineError> {
        let addr = format!("{}:{}", host, port);

        let tcp = TcpStream::connect(&addr).map_err(|e| EngineError::ConnectionFailed {
            host: addr.clone(),
            source: e,
        })?;

        let mut sess = ssh2::Session::new().map_err(|e| EngineError::ConnectionFailed {
            host: addr.clone(),
            source: io_err(e),
        })?;
        sess.set_tcp_stream(tcp);
        sess.handshake().map_err(|e| EngineError::ConnectionFailed {
            host: addr.clone(),
            source: io_err(e),
        })?;

        sess.userauth_password(user, password)
            .map_err(|_| EngineError::AuthFailed {
                host: addr.clone(),
                user: user.to_string(),
            })?;
        if !sess.authenticated() {
            return Err(EngineError::AuthFailed {
                host: addr,
                user: user.to_string(),
            });
        }

        info!(host = %addr, user = %user, "ssh session established");

        Ok(SftpSession {
            host: addr,
            user: user.to_string(),
            sess: Mutex::new(Some(sess)),
            sftp: Mutex::new(None),
            wire_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Request the SFTP subsystem on the established SSH session.
    ///
    /// # Errors
    /// `SubsystemUnavailable` if the session is closed, `ConnectionFailed`
    /// if the server refuses the subsystem.
    pub fn open_subsystem(&self) -> Result<(), EngineError> {
        let guard = self.sess.lock().unwrap();
        let sess = guard.as_ref().ok_or(EngineError::SubsystemUnavailable)?;

        let sftp = sess.sftp().map_err(|e| EngineError::ConnectionFailed {
            host: self.host.clone(),
            source: io_err(e),
        })?;
        *self.sftp.lock().unwrap() = Some(sftp);

        info!(host = %self.host, "sftp subsystem active");
        Ok(())
    }

    /// The user this session authenticated as.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Tear down the SFTP subsystem and the SSH session.
    ///
    /// Idempotent: later calls are no-ops, so the engine's caller can close
    /// unconditionally no matter how many workers were mid-flight.
    pub fn close(&self) {
        if self.sftp.lock().unwrap().take().is_some() {
            debug!(host = %self.host, "sftp subsystem closed");
        }
        if let Some(sess) = self.sess.lock().unwrap().take() {
            let _ = sess.disconnect(None, "closing", None);
            info!(host = %self.host, "ssh session closed");
        }
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// A remote file handle whose reads/writes are serialized through the
/// session-wide wire lock.
struct LockedFile {
    file: ssh2::File,
    wire_lock: Arc<Mutex<()>>,
}

impl Read for LockedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let _wire = self.wire_lock.lock().unwrap();
        self.file.read(buf)
    }
}

impl Write for LockedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _wire = self.wire_lock.lock().unwrap();
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let _wire = self.wire_lock.lock().unwrap();
        self.file.flush()
    }
}

impl RemoteFs for SftpSession {
    fn ensure_ready(&self) -> Result<(), EngineError> {
        if self.sftp.lock().unwrap().is_some() {
            Ok(())
        } else {
            Err(EngineError::SubsystemUnavailable)
        }
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, EngineError> {
        let guard = self.sftp.lock().unwrap();
        let sftp = guard.as_ref().ok_or(EngineError::SubsystemUnavailable)?;

        let _wire = self.wire_lock.lock().unwrap();
        let file = sftp
            .open(Path::new(path))
            .map_err(|e| remote_err(path, e))?;
        Ok(Box::new(LockedFile {
            file,
            wire_lock: Arc::clone(&self.wire_lock),
        }))
    }

    fn create(&self, path: &str) -> Result<Box<dyn Write + '_>, EngineError> {
        let guard = self.sftp.lock().unwrap();
        let sftp = guard.as_ref().ok_or(EngineError::SubsystemUnavailable)?;

        let _wire = self.wire_lock.lock().unwrap();
        let file = sftp
            .create(Path::new(path))
            .map_err(|e| remote_err(path, e))?;
        Ok(Box::new(LockedFile {
            file,
            wire_lock: Arc::clone(&self.wire_lock),
        }))
    }

    fn getwd(&self) -> Result<String, EngineError> {
        let guard = self.sftp.lock().unwrap();
        let sftp = guard.as_ref().ok_or(EngineError::SubsystemUnavailable)?;

        let _wire = self.wire_lock.lock().unwrap();
        let cwd = sftp
            .realpath(Path::new("."))
            .map_err(|e| remote_err(".", e))?;
        Ok(cwd.to_string_lossy().into_owned())
    }

    fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, EngineError> {
        let guard = self.sftp.lock().unwrap();
        let sftp = guard.as_ref().ok_or(EngineError::SubsystemUnavailable)?;

        let _wire = self.wire_lock.lock().unwrap();
        let entries = sftp
            .readdir(Path::new(path))
            .map_err(|e| remote_err(path, e))?;

        Ok(entries
            .into_iter()
            .map(|(entry_path, stat)| RemoteEntry {
                name: file_name_of(&entry_path),
                size: stat.size.unwrap_or(0),
                is_dir: stat.is_dir(),
            })
            .collect())
    }

    fn stat(&self, path: &str) -> Result<RemoteEntry, EngineError> {
        let guard = self.sftp.lock().unwrap();
        let sftp = guard.as_ref().ok_or(EngineError::SubsystemUnavailable)?;

        let _wire = self.wire_lock.lock().unwrap();
        let stat = sftp
            .stat(Path::new(path))
            .map_err(|e| remote_err(path, e))?;
        Ok(RemoteEntry {
            name: file_name_of(Path::new(path)),
            size: stat.size.unwrap_or(0),
            is_dir: stat.is_dir(),
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
pub mod memory {
    //! In-memory [`RemoteFs`] for tests: a map of path -> bytes, plus a
    //! flag standing in for the "subsystem never opened" state.

    use super::{RemoteEntry, RemoteFs};
    use crate::error::EngineError;
    use std::collections::HashMap;
    use std::io::{self, Cursor, Read, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    pub struct MemoryRemoteFs {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        ready: bool,
    }

    impl MemoryRemoteFs {
        /// A session with the file-transfer subsystem open.
        pub fn new() -> Self {
            MemoryRemoteFs {
                files: Arc::new(Mutex::new(HashMap::new())),
                ready: true,
            }
        }

        /// A session whose subsystem was never opened.
        pub fn unopened() -> Self {
            MemoryRemoteFs {
                files: Arc::new(Mutex::new(HashMap::new())),
                ready: false,
            }
        }

        pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.into());
        }

        pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().unwrap().get(path).cloned()
        }
    }

    /// Buffers writes and commits the file into the shared map on flush
    /// (and again on drop, in case the caller forgot).
    struct MemWriter {
        path: String,
        buf: Vec<u8>,
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MemWriter {
        fn commit(&self) {
            self.files
                .lock()
                .unwrap()
                .insert(self.path.clone(), self.buf.clone());
        }
    }

    impl Write for MemWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.commit();
            Ok(())
        }
    }

    impl Drop for MemWriter {
        fn drop(&mut self) {
            self.commit();
        }
    }

    impl RemoteFs for MemoryRemoteFs {
        fn ensure_ready(&self) -> Result<(), EngineError> {
            if self.ready {
                Ok(())
            } else {
                Err(EngineError::SubsystemUnavailable)
            }
        }

        fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, EngineError> {
            self.ensure_ready()?;
            match self.files.lock().unwrap().get(path) {
                Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
                None => Err(EngineError::RemoteIo {
                    path: path.to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no such remote file"),
                }),
            }
        }

        fn create(&self, path: &str) -> Result<Box<dyn Write + '_>, EngineError> {
            self.ensure_ready()?;
            Ok(Box::new(MemWriter {
                path: path.to_string(),
                buf: Vec::new(),
                files: Arc::clone(&self.files),
            }))
        }

        fn getwd(&self) -> Result<String, EngineError> {
            self.ensure_ready()?;
            Ok("/".to_string())
        }

        fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, EngineError> {
            self.ensure_ready()?;
            let prefix = if path.ends_with('/') {
                path.to_string()
            } else {
                format!("{}/", path)
            };
            let files = self.files.lock().unwrap();
            let mut entries: Vec<RemoteEntry> = files
                .iter()
                .filter(|(p, _)| path == "/" || p.starts_with(&prefix))
                .map(|(p, bytes)| RemoteEntry {
                    name: p.rsplit('/').next().unwrap_or(p).to_string(),
                    size: bytes.len() as u64,
                    is_dir: false,
                })
                .collect();
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(entries)
        }

        fn stat(&self, path: &str) -> Result<RemoteEntry, EngineError> {
            self.ensure_ready()?;
            match self.files.lock().unwrap().get(path) {
                Some(bytes) => Ok(RemoteEntry {
                    name: path.rsplit('/').next().unwrap_or(path).to_string(),
                    size: bytes.len() as u64,
                    is_dir: false,
                }),
                None => Err(EngineError::RemoteIo {
                    path: path.to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no such remote file"),
                }),
            }
        }
    }
}
