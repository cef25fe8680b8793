//! Data models for ERP API entities.
//!
//! This module contains the request and response shapes exchanged with
//! the ERP API:
//!
//! - `UserRecord`, `UserId`: the user entity as returned by the server
//! - `NewUser`, `UserUpdate`: request bodies for registration and updates
//! - `UserList`, `UserCount`: listing and counting responses
//! - `TokenPair`, `LoginResponse`, `Credentials`: authentication payloads

pub mod token;
pub mod user;

pub use token::{Credentials, LoginResponse, TokenPair};
pub use user::{NewUser, UserCount, UserId, UserList, UserRecord, UserUpdate};
