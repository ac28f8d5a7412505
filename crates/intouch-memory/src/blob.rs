//! Blob stores for the preference file.

use intouch_core::{
    error::IntouchError,
    traits::{BlobGuard, BlobStore},
};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Preference blob kept in a file, with a sibling lock file for cross-process exclusion.
///
/// On unix the lock is an advisory `flock` on `<path>.lock`. The kernel drops
/// it when the holder exits, so a crashed process never leaves the store
/// locked. The lock file itself is left in place.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");
        Self {
            lock_path: PathBuf::from(lock_name),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn held_elsewhere(&self) -> IntouchError {
        IntouchError::Lock(format!(
            "{} is held by another intouch process",
            self.lock_path.display()
        ))
    }

    fn lock_error(&self, e: std::io::Error) -> IntouchError {
        IntouchError::Lock(format!("{}: {e}", self.lock_path.display()))
    }

    #[cfg(unix)]
    fn acquire(&self) -> Result<File, IntouchError> {
        use std::os::unix::io::AsRawFd;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| self.lock_error(e))?;
        // SAFETY: the descriptor belongs to `file`, which is alive for the call.
        if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } != 0 {
            let e = std::io::Error::last_os_error();
            return Err(if e.kind() == ErrorKind::WouldBlock {
                self.held_elsewhere()
            } else {
                self.lock_error(e)
            });
        }
        Ok(file)
    }

    #[cfg(not(unix))]
    fn acquire(&self) -> Result<File, IntouchError> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => self.held_elsewhere(),
                _ => self.lock_error(e),
            })
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self) -> Result<Option<Vec<u8>>, IntouchError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IntouchError::Storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), IntouchError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves a truncated blob.
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        std::fs::write(&tmp, bytes).map_err(|e| {
            IntouchError::Storage(format!("failed to write {}: {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            IntouchError::Storage(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }

    fn lock(&self) -> Result<BlobGuard, IntouchError> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = self.acquire()?;
        // Holder pid, for humans inspecting the lock file.
        if let Err(e) = file
            .set_len(0)
            .and_then(|()| writeln!(file, "{}", std::process::id()))
        {
            warn!("blob: failed to stamp {}: {e}", self.lock_path.display());
        }

        debug!("blob: locked {}", self.lock_path.display());
        let lock_path = self.lock_path.clone();
        Ok(BlobGuard::on_release(move || release(file, &lock_path)))
    }
}

/// Closing the descriptor drops the `flock`.
#[cfg(unix)]
fn release(file: File, _lock_path: &Path) {
    drop(file);
}

#[cfg(not(unix))]
fn release(file: File, lock_path: &Path) {
    drop(file);
    if let Err(e) = std::fs::remove_file(lock_path) {
        warn!("blob: failed to release {}: {e}", lock_path.display());
    }
}

/// In-memory blob, for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `bytes`.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self) -> Result<Option<Vec<u8>>, IntouchError> {
        let guard = self
            .bytes
            .lock()
            .map_err(|_| IntouchError::Storage("memory blob poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), IntouchError> {
        let mut guard = self
            .bytes
            .lock()
            .map_err(|_| IntouchError::Storage("memory blob poisoned".to_string()))?;
        *guard = Some(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> FileBlobStore {
        FileBlobStore::new(dir.path().join("contacts.json"))
    }

    #[test]
    fn test_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(&dir).read().unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let blob = store(&dir);
        blob.write(b"{\"a\":1}").unwrap();
        assert_eq!(blob.read().unwrap().as_deref(), Some(&b"{\"a\":1}"[..]));
        blob.write(b"{}").unwrap();
        assert_eq!(blob.read().unwrap().as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let blob = FileBlobStore::new(dir.path().join("nested/deeper/contacts.json"));
        blob.write(b"{}").unwrap();
        assert!(blob.path().exists());
    }

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let blob = store(&dir);
        let guard = blob.lock().unwrap();
        assert!(matches!(blob.lock(), Err(IntouchError::Lock(_))));
        drop(guard);
        let _again = blob.lock().unwrap();
    }

    #[test]
    fn test_lock_conflicts_across_stores() {
        let dir = tempfile::tempdir().unwrap();
        let first = store(&dir);
        let second = store(&dir);
        let guard = first.lock().unwrap();
        assert!(matches!(second.lock(), Err(IntouchError::Lock(_))));
        drop(guard);
        let _guard = second.lock().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_leftover_lock_file_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let blob = store(&dir);
        std::fs::write(dir.path().join("contacts.json.lock"), "999999\ngarbage").unwrap();

        let guard = blob.lock().unwrap();
        let stamped = std::fs::read_to_string(dir.path().join("contacts.json.lock")).unwrap();
        assert_eq!(stamped.trim(), std::process::id().to_string());
        drop(guard);

        // Still there after release, and still lockable.
        assert!(dir.path().join("contacts.json.lock").exists());
        assert!(blob.lock().is_ok());
    }

    #[test]
    fn test_memory_store() {
        let blob = MemoryBlobStore::new();
        assert!(blob.read().unwrap().is_none());
        blob.write(b"x").unwrap();
        assert_eq!(blob.read().unwrap(), Some(b"x".to_vec()));
        assert_eq!(
            MemoryBlobStore::with_bytes("y").read().unwrap(),
            Some(b"y".to_vec())
        );
    }
}
