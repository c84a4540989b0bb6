pub mod session;

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use fslock::LockFile;
use serde::Serialize;

pub use session::{SessionContext, SessionError, User};

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("file stored in an invalid location: {0}")]
    InvalidLocation(PathBuf),
    #[error("failed to acquire file lock")]
    AcquireLock(#[source] fslock::Error),
    #[error("failed to open temporary file")]
    OpenTmpFile(#[source] std::io::Error),
    #[error("failed to write temporary file")]
    WriteTmpFile(#[source] serde_json::Error),
    #[error("failed to rename temporary file")]
    RenameTmpFile(#[source] tempfile::PersistError),
}

/// Take the lock guarding `path`.
///
/// The lock is a `<name>.lock` sidecar rather than the file itself,
/// since the guarded file is replaced on every write. The sidecar stays
/// behind after unlocking; its existence says nothing about whether the
/// lock is held.
pub fn acquire_file_lock(path: impl AsRef<Path>) -> Result<LockFile, SerializeError> {
    let lock_path = lock_path(path.as_ref());
    let mut lock = LockFile::open(&lock_path).map_err(SerializeError::AcquireLock)?;
    lock.lock().map_err(SerializeError::AcquireLock)?;
    Ok(lock)
}

/// Write a value to disk as JSON, atomically.
///
/// The value goes to a temporary file in the same directory, which is
/// then renamed over `path`, so readers never observe a partial write.
/// Callers must hold the [LockFile] for `path` (see
/// [acquire_file_lock]); passing a lock for a different file bypasses
/// the locking entirely.
///
/// `path` must have a parent directory.
pub fn serialize_atomically<T>(
    value: &T,
    path: &impl AsRef<Path>,
    _lock: LockFile,
) -> Result<(), SerializeError>
where
    T: ?Sized + Serialize,
{
    // Fails only for paths like "/", "." or the empty string.
    let parent = path
        .as_ref()
        .parent()
        .ok_or_else(|| SerializeError::InvalidLocation(path.as_ref().to_path_buf()))?;

    let temp_file = tempfile::NamedTempFile::new_in(parent).map_err(SerializeError::OpenTmpFile)?;
    serde_json::to_writer_pretty(BufWriter::new(&temp_file), value)
        .map_err(SerializeError::WriteTmpFile)?;
    temp_file
        .persist(path.as_ref())
        .map_err(SerializeError::RenameTmpFile)?;
    Ok(())
}

fn lock_path(path: &Path) -> PathBuf {
    let mut os_string = path.as_os_str().to_os_string();
    os_string.push(".lock");
    PathBuf::from(os_string)
}

/// Returns a `tracing`-compatible form of a [Path]
pub fn traceable_path(p: impl AsRef<Path>) -> impl tracing::Value {
    p.as_ref().display().to_string()
}
