//! Directory-backed storage backend.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{KeyValueStore, StorageError};

/// Key-value store keeping one file per key inside a directory.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so a reader never observes a half-written value. The directory
/// is created on first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. No filesystem access happens here.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the stored keys.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(key))
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_owned(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(|e| Self::io_error(key, e))?;

        let tmp = self.root.join(format!(".{key}.tmp"));
        let mut file = fs::File::create(&tmp).map_err(|e| Self::io_error(key, e))?;
        file.write_all(value.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| Self::io_error(key, e))?;
        drop(file);

        fs::rename(&tmp, &path).map_err(|e| Self::io_error(key, e))?;
        debug!(key, bytes = value.len(), "Persisted storage key");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("never-created"));
        assert_eq!(store.get("reklama_cart").unwrap(), None);
    }

    #[test]
    fn test_set_creates_directory_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        store.set("reklama_cart", "[1]").unwrap();
        store.set("reklama_cart", "[2]").unwrap();

        assert_eq!(store.get("reklama_cart").unwrap().as_deref(), Some("[2]"));
        assert!(!dir.path().join("data/.reklama_cart.tmp").exists());
    }

    #[test]
    fn test_values_survive_a_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        FileStore::new(dir.path()).set("admin_token", "abc").unwrap();

        let reopened = FileStore::new(dir.path());
        assert_eq!(reopened.get("admin_token").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set("reklama_language", "uz").unwrap();
        store.remove("reklama_language").unwrap();
        store.remove("reklama_language").unwrap();
        assert_eq!(store.get("reklama_language").unwrap(), None);
    }

    #[test]
    fn test_rejects_path_traversal_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(StorageError::InvalidKey(_))));
        assert!(matches!(
            store.get(".hidden"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
