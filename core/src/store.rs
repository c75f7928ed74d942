//! Durable key-value storage for session tokens.
//!
//! # Design
//! The store treats tokens as opaque strings and knows exactly three keys.
//! Its operations are infallible from the caller's point of view: a store
//! that fails to reach its backing medium logs the failure and keeps serving
//! from memory, so a cold start or a logout never aborts on storage I/O.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The fixed keys a `TokenStore` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    AccessToken,
    RefreshToken,
    /// Last signed-in username, for display only.
    Username,
}

impl TokenKey {
    pub fn storage_name(self) -> &'static str {
        match self {
            TokenKey::AccessToken => "AccessToken",
            TokenKey::RefreshToken => "RefreshToken",
            TokenKey::Username => "Username",
        }
    }
}

/// Persists and retrieves the session tokens.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Option<String>;
    fn set(&self, key: TokenKey, value: &str);
    fn remove(&self, key: TokenKey);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    entries: Arc<Mutex<HashMap<TokenKey, String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        lock(&self.entries).get(&key).cloned()
    }

    fn set(&self, key: TokenKey, value: &str) {
        lock(&self.entries).insert(key, value.to_string());
    }

    fn remove(&self, key: TokenKey) {
        lock(&self.entries).remove(&key);
    }
}

/// Store backed by a JSON object on disk, keyed by `TokenKey::storage_name`.
///
/// The file is read once by `open` and rewritten after every mutation.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileTokenStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable or malformed one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "token store is malformed, starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read token store");
                HashMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        if let Err(e) = write_atomically(&self.path, entries) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist token store");
        }
    }
}

fn write_atomically(path: &Path, entries: &HashMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        lock(&self.entries).get(key.storage_name()).cloned()
    }

    fn set(&self, key: TokenKey, value: &str) {
        let mut entries = lock(&self.entries);
        entries.insert(key.storage_name().to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: TokenKey) {
        let mut entries = lock(&self.entries);
        if entries.remove(key.storage_name()).is_some() {
            self.persist(&entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_clones_share_entries() {
        let store = MemoryTokenStore::new();
        let other = store.clone();
        store.set(TokenKey::AccessToken, "A1");
        assert_eq!(other.get(TokenKey::AccessToken).as_deref(), Some("A1"));
        other.remove(TokenKey::AccessToken);
        assert!(store.get(TokenKey::AccessToken).is_none());
    }

    #[test]
    fn remove_missing_key_is_a_no_op() {
        let store = MemoryTokenStore::new();
        store.remove(TokenKey::RefreshToken);
        assert!(store.get(TokenKey::RefreshToken).is_none());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("tokens.json");

        let store = FileTokenStore::open(&path);
        assert!(store.get(TokenKey::AccessToken).is_none());
        store.set(TokenKey::AccessToken, "A1");
        store.set(TokenKey::RefreshToken, "R1");
        store.set(TokenKey::Username, "alice");
        store.remove(TokenKey::Username);

        let reopened = FileTokenStore::open(&path);
        assert_eq!(reopened.get(TokenKey::AccessToken).as_deref(), Some("A1"));
        assert_eq!(reopened.get(TokenKey::RefreshToken).as_deref(), Some("R1"));
        assert!(reopened.get(TokenKey::Username).is_none());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["AccessToken"], "A1");
    }

    #[test]
    fn malformed_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileTokenStore::open(&path);
        assert!(store.get(TokenKey::AccessToken).is_none());
        store.set(TokenKey::AccessToken, "A1");
        assert_eq!(
            FileTokenStore::open(&path).get(TokenKey::AccessToken).as_deref(),
            Some("A1")
        );
    }
}
