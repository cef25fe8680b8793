//! Authentication module for credential persistence and token refresh.
//!
//! This module provides:
//! - `CredentialStore`: typed access to tokens and the cached user
//! - `KeyValueStore` media: memory, JSON file, OS keychain via keyring
//! - `TokenRefresher`: the single-flight refresh protocol
//! - `SessionEvent`: login/logout/refresh/termination notifications

pub mod credentials;
pub mod refresh;
pub mod session;
pub mod storage;

pub use credentials::CredentialStore;
pub use refresh::TokenRefresher;
pub use session::SessionEvent;
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
