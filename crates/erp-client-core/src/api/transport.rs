//! The network capability the pipeline sends requests through.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::error::TransportError;
use super::request::{HttpRequest, HttpResponse};
use super::ApiError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Dropping the returned future cancels the request.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by `reqwest`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse::new(status, body))
    }
}

/// Race `request` against `deadline`. On expiry the transport future is
/// dropped, which aborts the request, and `Timeout` is returned.
pub(crate) async fn execute_with_deadline(
    transport: &dyn Transport,
    request: HttpRequest,
    deadline: Duration,
) -> Result<HttpResponse, ApiError> {
    let method = request.method.clone();
    let url = request.url.clone();
    debug!(method = %method, url = %url, "Sending HTTP request");

    match tokio::time::timeout(deadline, transport.execute(request)).await {
        Ok(Ok(response)) => {
            debug!(status = %response.status, url = %url, "Received HTTP response");
            Ok(response)
        }
        Ok(Err(TransportError::TimedOut)) | Err(_) => {
            warn!(
                method = %method,
                url = %url,
                timeout_ms = deadline.as_millis() as u64,
                "Request timed out"
            );
            Err(ApiError::Timeout(deadline))
        }
        Ok(Err(e)) => {
            warn!(method = %method, url = %url, error = %e, "HTTP request error");
            Err(ApiError::NetworkError(e))
        }
    }
}
