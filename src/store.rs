//! Persistent key/value store used to cache login credentials.
//!
//! The store is a single JSON document on disk guarded by an advisory lock
//! on a sibling `.lock` file. Only one [`StoreHandle`] may be alive at a time,
//! across processes and within one process: a second [`Store::open`] fails
//! with [`StoreError::Locked`] until the first handle is closed or dropped.
//!
//! ```text
//! ~/.local/share/hpecli/
//!   store.json        {"greenlake-context": "https://...", "glToken-https://...": "..."}
//!   store.json.lock
//! ```

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Errors raised by the credential store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store {path:?} is already open by another handle")]
    Locked { path: PathBuf },

    #[error("store I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize store {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("key {0:?} not found in store")]
    KeyAbsent(String),

    #[error("value for key {key:?} has an unexpected type: {source}")]
    TypeMismatch {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for key {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn is_key_absent(&self) -> bool {
        matches!(self, StoreError::KeyAbsent(_))
    }

    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Location of a store on disk. Cheap to clone; nothing is touched until
/// [`Store::open`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once something has been written to the store.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    /// Open the store exclusively.
    ///
    /// A missing data file is treated as an empty store. The returned handle
    /// holds the lock until it is closed or dropped.
    pub fn open(&self) -> Result<StoreHandle, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let lock_path = self.lock_path();
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StoreError::io(&lock_path, e))?;

        if !try_lock_exclusive(&lock).map_err(|e| StoreError::io(&lock_path, e))? {
            return Err(StoreError::Locked {
                path: self.path.clone(),
            });
        }

        // On any error below `lock` is dropped and the lock released.
        let entries = self.read_entries()?;
        debug!(path = %self.path.display(), keys = entries.len(), "opened store");

        Ok(StoreHandle {
            store: self.clone(),
            lock,
            entries,
        })
    }

    fn read_entries(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

/// An open, exclusively locked store.
///
/// Writes go straight to disk. The lock is released by [`StoreHandle::close`]
/// or when the handle is dropped, whichever comes first.
#[derive(Debug)]
pub struct StoreHandle {
    store: Store,
    lock: File,
    entries: BTreeMap<String, Value>,
}

impl StoreHandle {
    /// Read and decode the value stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| StoreError::KeyAbsent(key.to_string()))?;

        serde_json::from_value(value.clone()).map_err(|source| StoreError::TypeMismatch {
            key: key.to_string(),
            source,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    /// Remove `key`. Removing a key that does not exist is not an error.
    pub fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Release the lock.
    pub fn close(self) {
        debug!(path = %self.store.path.display(), "closing store");
    }

    fn persist(&self) -> Result<(), StoreError> {
        let path = self.store.path();
        let temp_path = self.store.temp_path();

        let content =
            serde_json::to_vec_pretty(&self.entries).map_err(|source| StoreError::Persist {
                path: path.to_path_buf(),
                source,
            })?;

        let mut file = open_private(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
        file.write_all(&content)
            .and_then(|()| file.sync_all())
            .map_err(|e| StoreError::io(&temp_path, e))?;

        fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e))
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        if let Err(e) = unlock(&self.lock) {
            debug!(error = %e, "failed to release store lock");
        }
    }
}

/// Create or truncate a file readable only by the current user.
fn open_private(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

/// Try to take an exclusive advisory lock without blocking.
///
/// Returns `Ok(false)` when another open file description already holds it.
fn try_lock_exclusive(file: &File) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: the fd is owned by `file` and valid for the duration of the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK)
        {
            return Ok(false);
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(true)
    }
}

fn unlock(file: &File) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: the fd is owned by `file` and valid for the duration of the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("store.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let (_dir, store) = temp_store();
        let db = store.open().unwrap();
        let err = db.get::<String>("anything").unwrap_err();
        assert!(err.is_key_absent());
    }

    #[test]
    fn test_exists_after_first_write() {
        let (_dir, store) = temp_store();
        assert!(!store.exists());

        let mut db = store.open().unwrap();
        db.set("k", "v").unwrap();
        db.close();
        assert!(store.exists());
    }

    #[test]
    fn test_persist_error_is_not_reported_as_corruption() {
        let source = serde_json::from_str::<Value>("x").unwrap_err();
        let err = StoreError::Persist {
            path: PathBuf::from("store.json"),
            source,
        };
        let message = err.to_string();
        assert!(message.starts_with("failed to serialize store"));
        assert!(!message.contains("corrupt"));
    }

    #[test]
    fn test_values_survive_reopen() {
        let (_dir, store) = temp_store();

        let mut db = store.open().unwrap();
        db.set("host", "ilo.example.com").unwrap();
        db.close();

        let db = store.open().unwrap();
        let host: String = db.get("host").unwrap();
        assert_eq!(host, "ilo.example.com");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("nested").join("deeper").join("store.json"));
        let mut db = store.open().unwrap();
        db.set("k", "v").unwrap();
        db.close();
        assert!(store.path().exists());
    }

    #[test]
    fn test_second_open_is_locked() {
        let (_dir, store) = temp_store();
        let _held = store.open().unwrap();

        let err = store.open().unwrap_err();
        assert!(matches!(err, StoreError::Locked { .. }));
    }

    #[test]
    fn test_drop_releases_lock() {
        let (_dir, store) = temp_store();
        {
            let _db = store.open().unwrap();
        }
        assert!(store.open().is_ok());
    }

    #[test]
    fn test_delete_missing_key_is_ok() {
        let (_dir, store) = temp_store();
        let mut db = store.open().unwrap();
        db.delete("never-set").unwrap();
    }

    #[test]
    fn test_delete_removes_key() {
        let (_dir, store) = temp_store();
        let mut db = store.open().unwrap();
        db.set("k", "v").unwrap();
        db.delete("k").unwrap();
        db.close();

        let db = store.open().unwrap();
        assert!(!db.contains("k"));
    }

    #[test]
    fn test_type_mismatch() {
        let (_dir, store) = temp_store();
        let mut db = store.open().unwrap();
        db.set("count", &42).unwrap();

        let err = db.get::<String>("count").unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
    }

    #[test]
    fn test_corrupt_file_fails_open_and_releases_lock() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "not json").unwrap();

        let err = store.open().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));

        // The failed open must not leave the lock held.
        fs::write(store.path(), "{}").unwrap();
        assert!(store.open().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = temp_store();
        let mut db = store.open().unwrap();
        db.set("token", "secret").unwrap();
        db.close();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
