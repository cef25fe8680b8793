//! API client for the ERP REST API.
//!
//! `send` is the single primitive every operation goes through. The
//! typed user operations live in `users.rs`.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::request::{HttpRequest, HttpResponse, RequestDescriptor};
use super::transport::{execute_with_deadline, ReqwestTransport, Transport};
use super::ApiError;
use crate::auth::session::SESSION_EVENT_CAPACITY;
use crate::auth::{CredentialStore, SessionEvent, TokenRefresher};
use crate::config::ClientConfig;
use crate::models::{LoginResponse, UserRecord};

// ============================================================================
// Endpoints
// ============================================================================

pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// API client for the ERP service.
/// Clone is cheap - clones share the transport, credential store, refresh
/// slot and event channel.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    refresher: TokenRefresher,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>, credentials: CredentialStore) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        let refresher = TokenRefresher::new(
            Arc::clone(&transport),
            credentials.clone(),
            config.url(REFRESH_PATH),
            config.timeout,
            events.clone(),
        );

        Self {
            config,
            transport,
            credentials,
            refresher,
            events,
        }
    }

    /// Create a client that talks to the network through reqwest
    pub fn with_reqwest(config: ClientConfig, credentials: CredentialStore) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::new(config, Arc::new(transport), credentials))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Receive session lifecycle events from this client and its clones
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ===== Pipeline =====

    /// Build the outgoing request: defaults first, then the stored bearer
    /// token, then caller headers on top.
    fn build_request(&self, descriptor: &RequestDescriptor) -> Result<HttpRequest, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if !descriptor.headers.contains_key(AUTHORIZATION) {
            if let Some(token) = self.credentials.access_token() {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::InvalidRequest("Stored access token is not a valid header value".to_string()))?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        for (name, value) in &descriptor.headers {
            headers.insert(name.clone(), value.clone());
        }

        Ok(HttpRequest {
            method: descriptor.method.clone(),
            url: self.config.url(&descriptor.path),
            headers,
            body: descriptor.body.clone(),
        })
    }

    /// Send a request with credentials and deadline applied.
    ///
    /// A 401 triggers at most one refresh-and-retry cycle; the retry's
    /// response is returned whatever its status. If the refresh fails the
    /// session is cleared and `AuthenticationFailed` is returned. Other
    /// non-2xx responses are returned as-is for the caller to interpret.
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(descriptor)?;
        let response = execute_with_deadline(self.transport.as_ref(), request, self.config.timeout).await?;

        if response.status != StatusCode::UNAUTHORIZED || !descriptor.refresh_on_unauthorized {
            return Ok(response);
        }

        warn!(path = %descriptor.path, "Received 401, refreshing token and retrying");
        let outcome = self.refresher.refresh_as_owner().await;
        if !outcome.refreshed {
            // Callers that joined a shared attempt leave the cleanup to its owner
            if outcome.owner {
                self.terminate_session();
            }
            return Err(ApiError::AuthenticationFailed);
        }

        let retry = self.build_request(descriptor)?;
        execute_with_deadline(self.transport.as_ref(), retry, self.config.timeout).await
    }

    /// Run the refresh protocol directly
    pub async fn refresh(&self) -> bool {
        self.refresher.refresh().await
    }

    fn terminate_session(&self) {
        warn!("Token refresh failed, terminating session");
        self.credentials.clear();
        self.credentials.clear_user();
        self.notify(SessionEvent::SessionTerminated);
    }

    /// Decode a 2xx body, or turn any other status into `ApiError::Api`
    pub(crate) fn decode<T: DeserializeOwned>(response: HttpResponse, default_message: &str) -> Result<T, ApiError> {
        Self::ensure_success(&response, default_message)?;
        response.json()
    }

    pub(crate) fn ensure_success(response: &HttpResponse, default_message: &str) -> Result<(), ApiError> {
        if response.is_success() {
            return Ok(());
        }
        debug!(
            status = %response.status,
            body = %ApiError::truncate_body(&response.text()),
            "Request failed"
        );
        Err(ApiError::from_response(response, default_message))
    }

    // ===== Authentication =====

    /// Log in and persist the issued tokens and user record.
    ///
    /// A 401 here means bad credentials, so it is reported as an API
    /// error rather than sent through the refresh protocol.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let descriptor = RequestDescriptor::post(LOGIN_PATH)
            .json(&LoginRequest { email, password })?
            .without_refresh();

        let response = self.send(&descriptor).await?;
        let login: LoginResponse = Self::decode(response, "Login failed")?;

        self.credentials.set(&login.tokens());
        self.credentials.set_user(&login.user);
        self.notify(SessionEvent::LoggedIn);
        info!(user_id = %login.user.id, "Logged in");

        Ok(login)
    }

    /// Clear tokens and cached user. The caller should leave the
    /// authenticated area.
    pub fn logout(&self) {
        self.credentials.clear();
        self.credentials.clear_user();
        self.notify(SessionEvent::LoggedOut);
        info!("Logged out");
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.credentials.get_user()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.credentials.has_role(role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.credentials.has_any_role(roles)
    }
}
