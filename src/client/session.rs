use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::StatusCode;
use restaurant_auth_api::{AuthUser, LoginRequest, LoginResponse};
use tokio::task::JoinHandle;

use crate::client::coordinator::RefreshCoordinator;
use crate::client::error::{AuthFailure, ClientError};
use crate::client::transport::{ApiRequest, ApiResponse, Transport};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const REFRESH_PATH: &str = "/api/refresh-token";

/// Pages the client may be sent to when the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Login,
    SessionExpired,
    Unauthorized,
}

impl Destination {
    pub fn path(self) -> &'static str {
        match self {
            Destination::Login => "/login",
            Destination::SessionExpired => "/session-expired",
            Destination::Unauthorized => "/unauthorized",
        }
    }
}

/// Front-end navigation hook.
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Authenticated HTTP client for the back-office.
///
/// Every call goes through [`SessionClient::send`], which silently refreshes
/// an expired access token once and replays the call. Concurrent expiries
/// share a single refresh.
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    coordinator: RefreshCoordinator,
    user: RwLock<Option<AuthUser>>,
    /// Set between logout and the next login: 401s are handed back untouched.
    bypass: AtomicBool,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            transport,
            navigator,
            coordinator: RefreshCoordinator::default(),
            user: RwLock::new(None),
            bypass: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.coordinator = RefreshCoordinator::new(timeout);
        self
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.user.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }

    /// Logs in and keeps the returned user as local session state.
    ///
    /// Goes straight to the transport: a 401 here means bad credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, ClientError> {
        let request = ApiRequest::post(LOGIN_PATH).with_json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;

        let response = self.transport.send(&request).await?.error_for_status()?;
        let body: LoginResponse = response.json()?;

        *self.user.write() = Some(body.auth_user.clone());
        self.bypass.store(false, Ordering::SeqCst);
        tracing::debug!(email = %body.auth_user.email, "client session opened");

        Ok(body.auth_user)
    }

    /// Drops the local session and leaves for the login page at once, then
    /// tells the server in the background. The server's answer is only
    /// logged.
    pub fn logout(&self) -> JoinHandle<()> {
        self.bypass.store(true, Ordering::SeqCst);
        *self.user.write() = None;
        self.navigator.navigate(Destination::Login);

        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.send(&ApiRequest::post(LOGOUT_PATH)).await {
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "logout call completed");
                }
                Err(err) => tracing::debug!(error = %err, "logout call failed"),
            }
        })
    }

    /// Sends `request`, refreshing and replaying it once if the access token
    /// had expired. Non-auth failures come back as the raw response.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        // Un refresh terminé après cet envoi suffit: on rejoue directement
        let sent_at = self.coordinator.generation();
        let response = self.transport.send(&request).await?;
        if response.status() != StatusCode::UNAUTHORIZED || self.bypassed() {
            return Ok(response);
        }

        if !response.is_token_expired() {
            self.end_session(Destination::Unauthorized);
            return Err(AuthFailure::Unauthorized.into());
        }

        self.refresh(sent_at).await?;

        // Rejouée une seule fois: un second 401 termine la session
        let replayed = self.transport.send(&request).await?;
        if replayed.status() == StatusCode::UNAUTHORIZED && !self.bypassed() {
            self.end_session(Destination::SessionExpired);
            return Err(AuthFailure::SessionExpired.into());
        }
        Ok(replayed)
    }

    /// [`Self::send`] then decode a successful JSON body.
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        self.send(request).await?.error_for_status()?.json()
    }

    /// Joins the in-flight refresh or starts one, unless one already
    /// succeeded since generation `sent_at`. Only the caller that performs
    /// the refresh acts on its failure.
    async fn refresh(&self, sent_at: u64) -> Result<(), AuthFailure> {
        self.coordinator
            .run_since(sent_at, move || async move {
                let outcome = self.call_refresh_endpoint().await;
                if let Err(failure) = &outcome {
                    tracing::warn!(%failure, "token refresh failed");
                    if let Some(destination) = failure.destination() {
                        self.end_session(destination);
                    }
                }
                outcome
            })
            .await
    }

    async fn call_refresh_endpoint(&self) -> Result<(), AuthFailure> {
        let response = self
            .transport
            .send(&ApiRequest::post(REFRESH_PATH))
            .await
            .map_err(|e| AuthFailure::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(AuthFailure::SessionExpired),
            StatusCode::FORBIDDEN => Err(AuthFailure::Unauthorized),
            status => Err(AuthFailure::Transport(format!(
                "refresh endpoint answered {status}"
            ))),
        }
    }

    fn bypassed(&self) -> bool {
        self.bypass.load(Ordering::SeqCst)
    }

    fn end_session(&self, destination: Destination) {
        *self.user.write() = None;
        // Déjà en route vers /login après un logout
        if self.bypassed() {
            return;
        }
        self.navigator.navigate(destination);
    }
}
