use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use restaurant_auth_api::ErrorResponse;
use serde::{Serialize, de::DeserializeOwned};

use crate::client::error::{ClientError, TransportError};

/// Outbound call, kept as plain data so it can be replayed after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Error body, when the server sent one.
    pub fn error(&self) -> Option<ErrorResponse> {
        serde_json::from_slice(&self.body).ok()
    }

    /// 401 caused only by an expired access token.
    pub fn is_token_expired(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
            && self.error().is_some_and(|error| error.is_token_expired())
    }

    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Status {
                status: self.status,
                error: self.error(),
            })
        }
    }
}

/// HTTP seam of the client. Implementations must keep the server's
/// `httpOnly` cookies between calls, as a browser would.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// [`Transport`] over a `reqwest` client with a cookie store.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restaurant_auth_api::codes;
    use serde_json::json;

    fn error_body(code: &str) -> Vec<u8> {
        json!({ "error": code, "message": "x" }).to_string().into_bytes()
    }

    #[test]
    fn only_expired_401_is_token_expired() {
        assert!(ApiResponse::new(StatusCode::UNAUTHORIZED, error_body(codes::TOKEN_EXPIRED))
            .is_token_expired());
        assert!(!ApiResponse::new(StatusCode::UNAUTHORIZED, error_body(codes::UNAUTHENTICATED))
            .is_token_expired());
        assert!(!ApiResponse::new(StatusCode::FORBIDDEN, error_body(codes::TOKEN_EXPIRED))
            .is_token_expired());
        assert!(!ApiResponse::new(StatusCode::UNAUTHORIZED, "not json").is_token_expired());
    }

    #[test]
    fn error_for_status_keeps_error_body() {
        let err = ApiResponse::new(StatusCode::CONFLICT, error_body(codes::DUPLICATE_ENTRY))
            .error_for_status()
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        match err {
            ClientError::Status { error, .. } => {
                assert_eq!(error.unwrap().error, codes::DUPLICATE_ENTRY);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn request_carries_json_body() {
        let request = ApiRequest::post("/api/auth/login")
            .with_json(&json!({ "email": "a@x.com" }))
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.unwrap()["email"], "a@x.com");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let transport = ReqwestTransport::new("http://localhost:8081/").unwrap();
        assert_eq!(transport.base_url, "http://localhost:8081");
    }
}
