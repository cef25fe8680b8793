//! ERP API client core.
//!
//! An authenticated request pipeline for the ERP REST API. The
//! [`ApiClient`] attaches the stored bearer token to each request, enforces
//! a per-request deadline, and recovers from an expired access token with a
//! single shared refresh followed by one retry. Tokens and the cached user
//! record live in a [`CredentialStore`] over a pluggable key-value medium.
//!
//! ```no_run
//! # async fn demo() -> Result<(), erp_client_core::ApiError> {
//! use erp_client_core::{ApiClient, CredentialStore, Environment};
//!
//! let client = ApiClient::with_reqwest(Environment::Development.profile(), CredentialStore::in_memory())?;
//! client.login("ana@example.com", "secret").await?;
//! let page = client.list_users(10, 0).await?;
//! println!("{} of {} users", page.users.len(), page.total);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, RequestDescriptor, ReqwestTransport, Transport, TransportError};
pub use auth::{CredentialStore, FileStore, KeyValueStore, KeyringStore, MemoryStore, SessionEvent};
pub use config::{ClientConfig, Config, Environment};
pub use models::{
    Credentials, LoginResponse, NewUser, TokenPair, UserCount, UserId, UserList, UserRecord, UserUpdate,
};
