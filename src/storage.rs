//! String key-value stores backing the progress records.

use dirs_next as dirs;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Synchronous string store. Implementations never fail from the caller's
/// point of view; persistence problems are logged.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn keys(&self) -> Vec<String>;
    fn remove(&mut self, key: &str);

    /// Remove every key in `keys` as one write.
    fn remove_many(&mut self, keys: &[String]) {
        for k in keys {
            self.remove(k);
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// A [`MemoryStore`] mirrored to a JSON object on disk after every write.
///
/// A file that exists but cannot be read is moved to `<file>.bak` before
/// anything is written. When that move fails the store never writes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    read_only: bool,
}

impl FileStore {
    pub const FILE: &'static str = "flavin_shape_progress.json";

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Open the store at `path`, starting empty when the file is missing or
    /// unreadable.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            path,
            inner: MemoryStore::new(),
            read_only: false,
        };
        let parsed = match std::fs::read(&store.path) {
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, String>>(&bytes)
                .map_err(|e| e.to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => return store,
            Err(e) => Err(e.to_string()),
        };
        match parsed {
            Ok(entries) => store.inner.entries = entries,
            Err(e) => {
                log::warn!("Unreadable store {}: {e}", store.path.display());
                store.set_aside();
            }
        }
        store
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }

    fn set_aside(&mut self) {
        let backup = self.backup_path();
        match std::fs::rename(&self.path, &backup) {
            Ok(()) => log::warn!("Moved unreadable store to {}", backup.display()),
            Err(e) => {
                log::error!(
                    "Failed to move {} aside, progress will not be saved: {e}",
                    self.path.display()
                );
                self.read_only = true;
            }
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Replace the file in one step through a sibling temp file.
    fn flush(&self) {
        if self.read_only {
            log::debug!("Store {} is read-only; skipping write", self.path.display());
            return;
        }
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let data = match serde_json::to_string_pretty(&self.inner.entries) {
            Ok(data) => data,
            Err(e) => {
                log::error!("Failed to serialize store: {e}");
                return;
            }
        };
        let mut tmp = self.path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let written = std::fs::write(&tmp, data).and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            log::error!("Failed to write {}: {e}", self.path.display());
            let _ = std::fs::remove_file(&tmp);
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.inner.set(key, value);
        self.flush();
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    fn remove(&mut self, key: &str) {
        self.inner.remove(key);
        self.flush();
    }

    fn remove_many(&mut self, keys: &[String]) {
        self.inner.remove_many(keys);
        self.flush();
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        (**self).set(key, value)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn remove(&mut self, key: &str) {
        (**self).remove(key)
    }

    fn remove_many(&mut self, keys: &[String]) {
        (**self).remove_many(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_basic_ops() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("a"), None);
        store.set("a", "1".into());
        store.set("b", "2".into());
        assert_eq!(store.get("a").as_deref(), Some("1"));
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
        store.remove("a");
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FileStore::FILE);

        let mut store = FileStore::open(&path);
        store.set("k", "{\"load\":40}".into());
        store.set("gone", "x".into());
        store.remove("gone");

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("k").as_deref(), Some("{\"load\":40}"));
        assert_eq!(reopened.get("gone"), None);
    }

    #[test]
    fn corrupt_file_is_kept_aside_before_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FileStore::FILE);
        let mut original = br#"{"FlavinShape_old":"{\"load\":80,\"completed\":true}","x":""#.to_vec();
        original.push(0xE9);
        original.extend_from_slice(br#""}"#);
        std::fs::write(&path, &original).unwrap();

        let mut store = FileStore::open(&path);
        assert!(store.keys().is_empty());
        assert!(!store.is_read_only());
        store.set("FlavinShape_new", "{}".into());

        assert_eq!(std::fs::read(store.backup_path()).unwrap(), original);
        let reopened = FileStore::open(&path);
        assert_eq!(reopened.keys(), vec!["FlavinShape_new".to_string()]);
    }

    #[test]
    fn invalid_json_is_kept_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FileStore::FILE);
        std::fs::write(&path, "not json").unwrap();

        let mut store = FileStore::open(&path);
        assert!(store.keys().is_empty());
        store.set("k", "v".into());
        assert_eq!(
            std::fs::read_to_string(store.backup_path()).unwrap(),
            "not json"
        );
    }

    #[test]
    fn unmovable_file_makes_store_read_only() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file and renaming it onto an
        // existing non-empty directory fails.
        let path = dir.path().join(FileStore::FILE);
        std::fs::create_dir(&path).unwrap();
        let backup = dir.path().join(format!("{}.bak", FileStore::FILE));
        std::fs::create_dir(&backup).unwrap();
        std::fs::write(backup.join("keep"), "x").unwrap();

        let mut store = FileStore::open(&path);
        assert!(store.is_read_only());
        store.set("k", "v".into());
        assert!(path.is_dir());
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn remove_many_writes_once_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FileStore::FILE);
        let mut store = FileStore::open(&path);
        store.set("a", "1".into());
        store.set("b", "2".into());
        store.set("c", "3".into());

        store.remove_many(&["a".to_string(), "c".to_string()]);
        let reopened = FileStore::open(&path);
        assert_eq!(reopened.keys(), vec!["b".to_string()]);
        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".tmp");
        assert!(!PathBuf::from(tmp).exists());
    }
}
