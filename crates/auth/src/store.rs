//! Persistent token storage
//!
//! The dashboards kept their credentials in browser local storage under four
//! fixed keys. [`TokenStore`] is the pluggable replacement: an in-memory map for
//! tests and short-lived tools, or a JSON file for operator stations that must
//! survive restarts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};

use crate::error::{AuthError, Result};
use crate::session::UserData;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const FIREBASE_TOKEN_KEY: &str = "firebaseToken";
pub const USER_DATA_KEY: &str = "userData";

/// Key/value storage for session credentials
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// JSON file backed store. Every write replaces the whole file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading existing entries if the file exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            HashMap::new()
        };
        debug!("Opened token store at {} ({} entries)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// Typed access to the four session keys of a [`TokenStore`]
#[derive(Clone)]
pub struct Tokens {
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("has_access_token", &self.access_token().is_some())
            .field("has_refresh_token", &self.refresh_token().is_some())
            .finish()
    }
}

impl Tokens {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, refresh_token)
    }

    pub fn set_access_token(&self, access_token: &str) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, access_token)
    }

    pub fn set_firebase_token(&self, token: &str) -> Result<()> {
        self.store.set(FIREBASE_TOKEN_KEY, token)
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn firebase_token(&self) -> Option<String> {
        self.store.get(FIREBASE_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn set_user_data(&self, user: &UserData) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.store.set(USER_DATA_KEY, &raw)
    }

    /// Stored user record; a corrupt record reads as absent
    pub fn user_data(&self) -> Option<UserData> {
        let raw = self.store.get(USER_DATA_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring unreadable user data in token store: {}", e);
                None
            }
        }
    }

    /// Remove every session key
    pub fn clear(&self) -> Result<()> {
        let mut first_error: Option<AuthError> = None;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY, FIREBASE_TOKEN_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to remove {} from token store: {}", key, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn test_clear_removes_all_keys() {
        let tokens = Tokens::in_memory();
        tokens.set_tokens("access", "refresh").unwrap();
        tokens.set_firebase_token("firebase").unwrap();
        tokens
            .set_user_data(&UserData::new("ops@example.com", Role::Admin))
            .unwrap();

        tokens.clear().unwrap();

        assert!(tokens.access_token().is_none());
        assert!(tokens.refresh_token().is_none());
        assert!(tokens.firebase_token().is_none());
        assert!(tokens.user_data().is_none());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("tokens.json");

        {
            let tokens = Tokens::new(Arc::new(FileTokenStore::open(&path).unwrap()));
            tokens.set_tokens("a1", "r1").unwrap();
            tokens
                .set_user_data(&UserData::new("lead@example.com", Role::Employee))
                .unwrap();
        }

        let reopened = Tokens::new(Arc::new(FileTokenStore::open(&path).unwrap()));
        assert_eq!(reopened.access_token().as_deref(), Some("a1"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("r1"));
        assert_eq!(reopened.user_data().unwrap().role, Role::Employee);
    }

    #[test]
    fn test_corrupt_user_data_reads_as_none() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(USER_DATA_KEY, "{not json").unwrap();
        let tokens = Tokens::new(store);
        assert!(tokens.user_data().is_none());
    }

    #[test]
    fn test_empty_token_is_absent() {
        let tokens = Tokens::in_memory();
        tokens.set_access_token("").unwrap();
        assert!(tokens.access_token().is_none());
    }
}
