//! Refresh protocol: trade the stored refresh token for a new token pair.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{CredentialStore, SessionEvent};
use crate::api::request::HttpRequest;
use crate::api::transport::{execute_with_deadline, Transport};
use crate::api::ApiError;
use crate::models::TokenPair;

type PendingRefresh = Shared<BoxFuture<'static, bool>>;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Runs the refresh protocol, sharing one in-flight attempt between all
/// callers that ask while it is running.
#[derive(Clone)]
pub struct TokenRefresher {
    attempt: RefreshAttempt,
    in_flight: Arc<Mutex<Option<PendingRefresh>>>,
}

#[derive(Clone)]
struct RefreshAttempt {
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    url: String,
    timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
}

fn lock(slot: &Mutex<Option<PendingRefresh>>) -> MutexGuard<'_, Option<PendingRefresh>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

impl TokenRefresher {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        credentials: CredentialStore,
        url: String,
        timeout: Duration,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            attempt: RefreshAttempt {
                transport,
                credentials,
                url,
                timeout,
                events,
            },
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Obtain a new token pair. Returns false without touching the
    /// credential store when no refresh token is held or the server
    /// rejects it.
    pub async fn refresh(&self) -> bool {
        let (pending, _) = self.join_or_start();
        pending.await
    }

    /// Like `refresh`, but also reports whether this caller started the
    /// attempt. Callers that joined an attempt already in flight see
    /// `owner == false`.
    pub(crate) async fn refresh_as_owner(&self) -> RefreshOutcome {
        let (pending, owner) = self.join_or_start();
        RefreshOutcome {
            refreshed: pending.await,
            owner,
        }
    }

    fn join_or_start(&self) -> (PendingRefresh, bool) {
        let mut slot = lock(&self.in_flight);
        if let Some(pending) = slot.as_ref() {
            debug!("Joining in-flight token refresh");
            return (pending.clone(), false);
        }

        let attempt = self.attempt.clone();
        let slot_ref: Weak<Mutex<Option<PendingRefresh>>> = Arc::downgrade(&self.in_flight);
        let pending = async move {
            let refreshed = attempt.run().await;
            // Later expiries start a fresh attempt
            if let Some(slot) = slot_ref.upgrade() {
                lock(&slot).take();
            }
            refreshed
        }
        .boxed()
        .shared();
        *slot = Some(pending.clone());
        (pending, true)
    }
}

/// Result of a refresh as seen by one caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RefreshOutcome {
    pub refreshed: bool,
    pub owner: bool,
}

impl RefreshAttempt {
    async fn run(self) -> bool {
        let Some(refresh_token) = self.credentials.refresh_token() else {
            debug!("No refresh token stored, skipping refresh");
            return false;
        };

        info!("Refreshing access token");
        let request = match self.request(&refresh_token) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Failed to build refresh request");
                return false;
            }
        };

        let response = match execute_with_deadline(self.transport.as_ref(), request, self.timeout).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return false;
            }
        };

        if !response.is_success() {
            warn!(
                status = %response.status,
                body = %ApiError::truncate_body(&response.text()),
                "Token refresh rejected"
            );
            return false;
        }

        let tokens: TokenPair = match response.json() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Failed to parse refresh response");
                return false;
            }
        };
        if !tokens.is_complete() {
            warn!("Refresh response does not contain both tokens");
            return false;
        }

        self.credentials.set(&tokens);
        let _ = self.events.send(SessionEvent::TokensRefreshed);
        info!("Access token refreshed");
        true
    }

    /// The refresh call never carries the expired access token
    fn request(&self, refresh_token: &str) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(&RefreshRequest { refresh_token })
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(HttpRequest {
            method: Method::POST,
            url: self.url.clone(),
            headers,
            body: Some(body),
        })
    }
}
