//! Filesystem collaborator for artifact and resource files
//!
//! Both engines touch plain files: the coordinator writes the committed
//! artifact, participants check and delete consumed source files. The trait
//! keeps those operations mockable; `DirStorage` is the real implementation
//! and fsyncs on write so the artifact survives a crash at the commit point.

use thiserror::Error;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// File operations needed by the commit protocol
pub trait Storage: Send + Sync {
    /// Whether a file with this name exists
    fn exists(&self, name: &str) -> bool;

    /// Write (create or truncate) a file durably
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Delete a file; returns whether it existed
    fn delete(&self, name: &str) -> Result<bool>;
}

/// Storage rooted at a directory on the local filesystem
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Storage for DirStorage {
    fn exists(&self, name: &str) -> bool {
        self.path_of(name).exists()
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_of(name);
        let io_err = |source| StorageError::Io {
            name: name.to_string(),
            source,
        };

        let mut file: File = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        match std::fs::remove_file(self.path_of(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// In-memory storage for tests
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a file
    pub fn put(&self, name: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
    }

    /// Read a file back (test inspection)
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).cloned()
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, name: &str) -> bool {
        self.files.lock().unwrap().contains_key(name)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.put(name, bytes);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.files.lock().unwrap().remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_storage_write_exists_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path());

        assert!(!storage.exists("collage.jpg"));
        storage.write("collage.jpg", b"jpeg-bytes").unwrap();
        assert!(storage.exists("collage.jpg"));
        assert_eq!(std::fs::read(dir.path().join("collage.jpg")).unwrap(), b"jpeg-bytes");

        assert!(storage.delete("collage.jpg").unwrap());
        assert!(!storage.exists("collage.jpg"));
        // Deleting a missing file reports false, not an error
        assert!(!storage.delete("collage.jpg").unwrap());
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.put("cat.jpg", b"cat");
        assert!(storage.exists("cat.jpg"));
        assert!(storage.delete("cat.jpg").unwrap());
        assert!(!storage.exists("cat.jpg"));
    }
}
