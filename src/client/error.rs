use reqwest::StatusCode;
use restaurant_auth_api::ErrorResponse;

use crate::client::session::Destination;

/// Why a silent refresh could not restore the session. Cloned to every
/// request waiting on the same refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("Your session has expired")]
    SessionExpired,
    #[error("You are not authorized to access this resource")]
    Unauthorized,
    #[error("Token refresh timed out")]
    Timeout,
    #[error("Token refresh failed: {0}")]
    Transport(String),
    #[error("Token refresh was abandoned")]
    Abandoned,
}

impl AuthFailure {
    /// Page to show once the local session is dropped. `None` for failures
    /// that say nothing about the session itself.
    pub fn destination(&self) -> Option<Destination> {
        match self {
            AuthFailure::SessionExpired => Some(Destination::SessionExpired),
            AuthFailure::Unauthorized => Some(Destination::Unauthorized),
            AuthFailure::Timeout | AuthFailure::Transport(_) | AuthFailure::Abandoned => None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Request failed with status {status}")]
    Status {
        status: StatusCode,
        error: Option<ErrorResponse>,
    },
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
