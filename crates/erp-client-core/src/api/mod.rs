//! REST API client module for the ERP service.
//!
//! This module provides the `ApiClient` request pipeline: it attaches the
//! stored bearer token to every request, enforces the configured deadline,
//! and on a 401 runs one refresh-and-retry cycle before giving up and
//! terminating the session.

pub mod client;
pub mod error;
pub mod request;
pub mod transport;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ApiClient;
pub use error::{ApiError, TransportError};
pub use request::{HttpRequest, HttpResponse, RequestDescriptor};
pub use transport::{ReqwestTransport, Transport};
