use std::sync::Arc;

use tracing::{debug, warn};

use super::storage::{KeyValueStore, MemoryStore};
use crate::models::{Credentials, TokenPair, UserRecord};

pub const ACCESS_TOKEN_KEY: &str = "erp_access_token";
pub const REFRESH_TOKEN_KEY: &str = "erp_refresh_token";
pub const USER_KEY: &str = "erp_user";

/// Typed access to the access token, refresh token and cached user.
///
/// Storage failures never propagate: reads that fail are treated as
/// absent and writes that fail are logged. Clone is cheap and clones share
/// the same medium.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// A store backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Credential read failed, treating as absent");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> bool {
        match self.backend.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = key, error = %e, "Credential write failed");
                false
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            warn!(key = key, error = %e, "Credential removal failed");
        }
    }

    // ===== Tokens =====

    pub fn get(&self) -> Credentials {
        Credentials {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
        }
    }

    /// Store both tokens. If either write fails both are removed so the
    /// store never holds half a pair.
    pub fn set(&self, tokens: &TokenPair) {
        let stored = self.write(ACCESS_TOKEN_KEY, &tokens.access_token)
            && self.write(REFRESH_TOKEN_KEY, &tokens.refresh_token);
        if stored {
            debug!("Stored token pair");
        } else {
            self.clear();
        }
    }

    pub fn clear(&self) {
        self.remove(ACCESS_TOKEN_KEY);
        self.remove(REFRESH_TOKEN_KEY);
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        self.set(&TokenPair::new(access_token, refresh_token));
    }

    pub fn clear_tokens(&self) {
        self.clear();
    }

    // ===== User =====

    pub fn get_user(&self) -> Option<UserRecord> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Cached user record is unreadable, ignoring");
                None
            }
        }
    }

    pub fn set_user(&self, user: &UserRecord) {
        match serde_json::to_string(user) {
            Ok(json) => {
                self.write(USER_KEY, &json);
            }
            Err(e) => warn!(error = %e, "Failed to serialize user record"),
        }
    }

    pub fn clear_user(&self) {
        self.remove(USER_KEY);
    }

    // ===== Gating =====

    /// Client-side gating only; the server stays authoritative.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.get_user().map(|u| u.has_role(role)).unwrap_or(false)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.get_user().map(|u| u.has_any_role(roles)).unwrap_or(false)
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    /// Medium whose every operation fails
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            bail!("storage unavailable")
        }
        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            bail!("storage unavailable")
        }
        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            bail!("storage unavailable")
        }
    }

    /// Medium that refuses to store the refresh token
    #[derive(Default)]
    struct RefreshRejectingStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for RefreshRejectingStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if key == REFRESH_TOKEN_KEY {
                bail!("quota exceeded");
            }
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.inner.remove(key)
        }
    }

    fn admin() -> UserRecord {
        serde_json::from_str(r#"{"id":1,"name":"Ana","role":"admin"}"#).unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let store = CredentialStore::in_memory();
        store.set_tokens("a", "r");
        assert_eq!(store.access_token().as_deref(), Some("a"));
        assert_eq!(store.refresh_token().as_deref(), Some("r"));
        assert!(store.is_authenticated());

        store.clear_tokens();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert!(!store.is_authenticated());
        assert!(store.get().is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = CredentialStore::in_memory();
        store.clear();
        store.clear_user();
        store.set_tokens("a", "r");
        store.clear();
        store.clear();
        assert!(store.get().is_empty());
    }

    #[test]
    fn test_user_round_trip() {
        let store = CredentialStore::in_memory();
        assert!(store.get_user().is_none());

        store.set_user(&admin());
        assert_eq!(store.get_user(), Some(admin()));
        assert!(store.has_role("admin"));
        assert!(store.has_any_role(&["manager", "admin"]));

        store.clear_user();
        assert!(store.get_user().is_none());
        assert!(!store.has_role("admin"));
    }

    #[test]
    fn test_clones_share_medium() {
        let store = CredentialStore::in_memory();
        let clone = store.clone();
        store.set_tokens("a", "r");
        assert_eq!(clone.access_token().as_deref(), Some("a"));
    }

    #[test]
    fn test_unreadable_user_is_absent() {
        let memory = Arc::new(MemoryStore::new());
        memory.set(USER_KEY, "not json").unwrap();
        let store = CredentialStore::new(memory);
        assert!(store.get_user().is_none());
        assert!(!store.has_role("admin"));
    }

    #[test]
    fn test_broken_medium_reads_as_absent() {
        let store = CredentialStore::new(Arc::new(BrokenStore));
        store.set_tokens("a", "r");
        store.set_user(&admin());
        store.clear();
        store.clear_user();

        assert!(store.get().is_empty());
        assert!(store.get_user().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_partial_write_is_rolled_back() {
        let store = CredentialStore::new(Arc::new(RefreshRejectingStore::default()));
        store.set_tokens("a", "r");
        assert!(store.get().is_empty());
    }
}
