//! In-crate transport double for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use super::error::TransportError;
use super::request::{HttpRequest, HttpResponse};
use super::transport::Transport;
use super::ApiClient;
use crate::auth::CredentialStore;
use crate::config::ClientConfig;

pub(crate) const TEST_BASE_URL: &str = "http://erp.test";
pub(crate) const TEST_TIMEOUT_MS: u64 = 100;

pub(crate) enum Reply {
    Json(u16, Value),
    Status(u16),
    /// Never answers; counts a cancellation when dropped
    Hang,
    Fail,
    After(Duration, Box<Reply>),
}

type Handler = dyn Fn(&HttpRequest) -> Reply + Send + Sync;

pub(crate) struct StubTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
    cancelled: AtomicUsize,
}

struct CancelGuard<'a>(&'a AtomicUsize);

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl StubTransport {
    pub(crate) fn new(handler: impl Fn(&HttpRequest) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            cancelled: AtomicUsize::new(0),
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path() == path)
            .collect()
    }

    pub(crate) fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn answer(&self, mut reply: Reply) -> Result<HttpResponse, TransportError> {
        loop {
            match reply {
                Reply::After(delay, next) => {
                    tokio::time::sleep(delay).await;
                    reply = *next;
                }
                Reply::Json(status, body) => {
                    return Ok(HttpResponse::new(
                        StatusCode::from_u16(status).unwrap(),
                        serde_json::to_vec(&body).unwrap(),
                    ));
                }
                Reply::Status(status) => {
                    return Ok(HttpResponse::new(StatusCode::from_u16(status).unwrap(), Vec::new()));
                }
                Reply::Hang => {
                    let _guard = CancelGuard(&self.cancelled);
                    return std::future::pending().await;
                }
                Reply::Fail => {
                    return Err(TransportError::Connection("connection refused".to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        self.answer(reply).await
    }
}

pub(crate) fn client_with_credentials(transport: Arc<StubTransport>, credentials: CredentialStore) -> ApiClient {
    ApiClient::new(ClientConfig::new(TEST_BASE_URL, TEST_TIMEOUT_MS), transport, credentials)
}

pub(crate) fn client_with(transport: Arc<StubTransport>) -> (ApiClient, CredentialStore) {
    let credentials = CredentialStore::in_memory();
    (client_with_credentials(transport, credentials.clone()), credentials)
}

pub(crate) fn bearer(request: &HttpRequest) -> Option<&str> {
    request.header("authorization")
}
