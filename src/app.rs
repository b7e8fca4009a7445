// src/app.rs

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::accounts::AccountService;
use crate::auth::cookies::CookiePolicy;
use crate::auth::gate::{OWNER_ONLY, STAFF, verify_roles, verify_token};
use crate::auth::jwt::{TokenLifetimes, TokenService};
use crate::auth::password::{BcryptPasswordHasher, PasswordHasher};
use crate::auth::services::SessionManager;
use crate::auth::token_hash::TokenHasher;
use crate::config::Config;
use crate::db::CredentialStore;
use crate::docs::openapi_json;
use crate::handlers::accounts::{create_manager, register};
use crate::handlers::auth::{login, logout, me, refresh_token};
use crate::handlers::health::health;

/// Services partagés par tous les handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<TokenService>,
    pub cookies: CookiePolicy,
    pub frontend_origin: HeaderValue,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> anyhow::Result<Self> {
        Self::with_lifetimes(config, store, TokenLifetimes::default())
    }

    pub fn with_lifetimes(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        lifetimes: TokenLifetimes,
    ) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenService::with_lifetimes(&config.token_secrets, lifetimes)?);
        let passwords: Arc<dyn PasswordHasher> =
            Arc::new(BcryptPasswordHasher::new(config.bcrypt_cost));

        let sessions = SessionManager::new(
            store.clone(),
            tokens.clone(),
            passwords.clone(),
            TokenHasher::new(&config.token_secrets.refresh),
        )
        .with_rotation(config.rotate_refresh_tokens);
        let accounts = AccountService::new(store, passwords);

        let cookies = CookiePolicy::new(
            config.is_production(),
            config.cookie_same_site,
            tokens.refresh_lifetime(),
        );
        let frontend_origin = config
            .frontend_url
            .parse::<HeaderValue>()
            .with_context(|| format!("FRONTEND_URL is not a valid origin: {}", config.frontend_url))?;

        Ok(Self {
            sessions: Arc::new(sessions),
            accounts: Arc::new(accounts),
            tokens,
            cookies,
            frontend_origin,
        })
    }
}

/// Routes accessibles sans authentification
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/register", post(register))
}

/// Routes protégées par le cookie `accessToken`, puis par rôle
fn protected_routes(state: &AppState) -> Router<AppState> {
    let staff = Router::new()
        .route("/auth/me", get(me))
        .layer(from_fn_with_state(STAFF, verify_roles));

    let owners = Router::new()
        .route("/managers", post(create_manager))
        .layer(from_fn_with_state(OWNER_ONLY, verify_roles));

    Router::new()
        .route("/auth/logout", post(logout))
        .merge(staff)
        .merge(owners)
        .layer(from_fn_with_state(state.clone(), verify_token))
}

fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Construit l'application complète
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", public_routes().merge(protected_routes(&state)))
        .layer(cors_layer(state.frontend_origin.clone()))
        // Middleware global de tracing
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::cookies::{ACCESS_COOKIE, REFRESH_COOKIE};
    use crate::auth::jwt::Identity;
    use crate::config::test_config;
    use crate::db::memory::InMemoryCredentialStore;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use chrono::{Duration, Utc};
    use lambda_http::tower::ServiceExt; // for oneshot
    use restaurant_auth_api::{ErrorResponse, LoginResponse, RefreshTokenResponse, Role, codes};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    pub(crate) fn test_state() -> AppState {
        test_state_with(TokenLifetimes::default())
    }

    pub(crate) fn test_state_with(lifetimes: TokenLifetimes) -> AppState {
        AppState::with_lifetimes(
            &test_config(),
            Arc::new(InMemoryCredentialStore::new()),
            lifetimes,
        )
        .expect("test configuration is valid")
    }

    struct TestResponse {
        status: StatusCode,
        cookies: HashMap<String, String>,
        set_cookie_headers: Vec<String>,
        body: Value,
    }

    impl TestResponse {
        async fn read(resp: Response<Body>) -> Self {
            let status = resp.status();
            let set_cookie_headers: Vec<String> = resp
                .headers()
                .get_all(header::SET_COOKIE)
                .iter()
                .map(|v| v.to_str().unwrap().to_string())
                .collect();
            let cookies = set_cookie_headers
                .iter()
                .filter_map(|h| h.split(';').next()?.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
                .await
                .unwrap();
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            Self {
                status,
                cookies,
                set_cookie_headers,
                body,
            }
        }

        fn error_code(&self) -> String {
            serde_json::from_value::<ErrorResponse>(self.body.clone())
                .unwrap()
                .error
        }
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        cookies: &[(&str, &str)],
        body: Option<Value>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(uri);
        if !cookies.is_empty() {
            let cookie = cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        TestResponse::read(app.clone().oneshot(req).await.unwrap()).await
    }

    async fn register_owner(app: &Router, email: &str) {
        let resp = send(
            app,
            "POST",
            "/api/register",
            &[],
            Some(json!({ "email": email, "password": "secret123", "confirmPassword": "secret123" })),
        )
        .await;
        assert_eq!(resp.status, StatusCode::CREATED);
    }

    async fn login_as(app: &Router, email: &str) -> TestResponse {
        let resp = send(
            app,
            "POST",
            "/api/auth/login",
            &[],
            Some(json!({ "email": email, "password": "secret123" })),
        )
        .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {}", resp.body);
        resp
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_router(test_state());
        let resp = send(&app, "GET", "/health", &[], None).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = build_router(test_state());
        let resp = send(&app, "GET", "/api-docs/openapi.json", &[], None).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert!(resp.body["paths"]["/api/refresh-token"].is_object());
    }

    #[tokio::test]
    async fn login_sets_both_cookies_and_matches_body() {
        let app = build_router(test_state());
        register_owner(&app, "boss@resto.fr").await;

        let resp = login_as(&app, "Boss@Resto.fr").await;
        let body: LoginResponse = serde_json::from_value(resp.body.clone()).unwrap();

        assert_eq!(resp.cookies[ACCESS_COOKIE], body.access_token);
        assert_eq!(resp.cookies[REFRESH_COOKIE], body.refresh_token);
        assert_eq!(body.auth_user.email, "boss@resto.fr");
        assert_eq!(body.auth_user.role, Role::Owner);
        assert!(
            resp.set_cookie_headers
                .iter()
                .all(|h| h.contains("HttpOnly") && h.contains("Path=/"))
        );
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_401() {
        let app = build_router(test_state());
        register_owner(&app, "boss@resto.fr").await;

        let resp = send(
            &app,
            "POST",
            "/api/auth/login",
            &[],
            Some(json!({ "email": "boss@resto.fr", "password": "wrongpass" })),
        )
        .await;

        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp.error_code(), codes::INVALID_CREDENTIALS);
        assert!(resp.cookies.is_empty());
    }

    #[tokio::test]
    async fn login_with_unknown_email_is_404() {
        let app = build_router(test_state());
        let resp = send(
            &app,
            "POST",
            "/api/auth/login",
            &[],
            Some(json!({ "email": "nobody@resto.fr", "password": "secret123" })),
        )
        .await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let app = build_router(test_state());
        let resp = send(
            &app,
            "POST",
            "/api/auth/login",
            &[],
            Some(json!({ "email": "boss@resto.fr" })),
        )
        .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.error_code(), codes::INVALID_INPUT);
    }

    #[tokio::test]
    async fn full_session_lifecycle() {
        let app = build_router(test_state());
        register_owner(&app, "boss@resto.fr").await;
        let login = login_as(&app, "boss@resto.fr").await;
        let access = login.cookies[ACCESS_COOKIE].clone();
        let refresh = login.cookies[REFRESH_COOKIE].clone();

        let me = send(&app, "GET", "/api/auth/me", &[(ACCESS_COOKIE, access.as_str())], None).await;
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body, json!({ "email": "boss@resto.fr", "role": "owner" }));

        let refreshed = send(
            &app,
            "POST",
            "/api/refresh-token",
            &[(REFRESH_COOKIE, refresh.as_str())],
            None,
        )
        .await;
        assert_eq!(refreshed.status, StatusCode::OK);
        let body: RefreshTokenResponse = serde_json::from_value(refreshed.body.clone()).unwrap();
        assert_eq!(refreshed.cookies[ACCESS_COOKIE], body.access_token);
        assert!(body.refresh_token.is_none());

        let logout = send(
            &app,
            "POST",
            "/api/auth/logout",
            &[(ACCESS_COOKIE, access.as_str())],
            None,
        )
        .await;
        assert_eq!(logout.status, StatusCode::OK);
        assert_eq!(logout.cookies[ACCESS_COOKIE], "");
        assert_eq!(logout.cookies[REFRESH_COOKIE], "");
        assert!(logout.set_cookie_headers.iter().all(|h| h.contains("Max-Age=0")));

        // Second logout with the still-valid access token is harmless.
        let again = send(
            &app,
            "POST",
            "/api/auth/logout",
            &[(ACCESS_COOKIE, access.as_str())],
            None,
        )
        .await;
        assert_eq!(again.status, StatusCode::OK);

        let after = send(
            &app,
            "POST",
            "/api/refresh-token",
            &[(REFRESH_COOKIE, refresh.as_str())],
            None,
        )
        .await;
        assert_eq!(after.status, StatusCode::UNAUTHORIZED);
        assert_eq!(after.error_code(), codes::INVALID_TOKEN);
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_unauthenticated() {
        let app = build_router(test_state());
        let resp = send(&app, "POST", "/api/refresh-token", &[], None).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp.error_code(), codes::UNAUTHENTICATED);
    }

    #[tokio::test]
    async fn stale_refresh_token_after_second_login_is_rejected() {
        let app = build_router(test_state());
        register_owner(&app, "boss@resto.fr").await;
        let first = login_as(&app, "boss@resto.fr").await;
        let _second = login_as(&app, "boss@resto.fr").await;

        let resp = send(
            &app,
            "POST",
            "/api/refresh-token",
            &[(REFRESH_COOKIE, first.cookies[REFRESH_COOKIE].as_str())],
            None,
        )
        .await;

        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp.error_code(), codes::INVALID_TOKEN);
    }

    #[tokio::test]
    async fn expired_access_token_reports_token_expired() {
        let state = test_state();
        let app = build_router(state.clone());
        let expired = state
            .tokens
            .issue_access_token_at(
                &Identity {
                    email: "boss@resto.fr".to_string(),
                    role: Role::Owner,
                },
                Utc::now() - Duration::hours(1),
            )
            .unwrap();

        let resp = send(&app, "GET", "/api/auth/me", &[(ACCESS_COOKIE, expired.as_str())], None).await;

        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp.error_code(), codes::TOKEN_EXPIRED);
    }

    #[tokio::test]
    async fn only_owners_create_managers() {
        let app = build_router(test_state());
        register_owner(&app, "boss@resto.fr").await;
        let owner = login_as(&app, "boss@resto.fr").await;

        let created = send(
            &app,
            "POST",
            "/api/managers",
            &[(ACCESS_COOKIE, owner.cookies[ACCESS_COOKIE].as_str())],
            Some(json!({ "email": "chef@resto.fr", "password": "secret123" })),
        )
        .await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body["role"], "manager");

        let manager = login_as(&app, "chef@resto.fr").await;
        let manager_access = manager.cookies[ACCESS_COOKIE].clone();

        let denied = send(
            &app,
            "POST",
            "/api/managers",
            &[(ACCESS_COOKIE, manager_access.as_str())],
            Some(json!({ "email": "sous-chef@resto.fr", "password": "secret123" })),
        )
        .await;
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
        assert_eq!(denied.error_code(), codes::FORBIDDEN);

        let me = send(&app, "GET", "/api/auth/me", &[(ACCESS_COOKIE, manager_access.as_str())], None).await;
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body["role"], "manager");
    }

    #[tokio::test]
    async fn creating_manager_requires_authentication() {
        let app = build_router(test_state());
        let resp = send(
            &app,
            "POST",
            "/api/managers",
            &[],
            Some(json!({ "email": "chef@resto.fr", "password": "secret123" })),
        )
        .await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = build_router(test_state());
        register_owner(&app, "boss@resto.fr").await;

        let resp = send(
            &app,
            "POST",
            "/api/register",
            &[],
            Some(json!({ "email": "boss@resto.fr", "password": "secret123", "confirmPassword": "secret123" })),
        )
        .await;

        assert_eq!(resp.status, StatusCode::CONFLICT);
        assert_eq!(resp.error_code(), codes::DUPLICATE_ENTRY);
    }

    #[tokio::test]
    async fn rotation_resets_refresh_cookie() {
        let mut config = test_config();
        config.rotate_refresh_tokens = true;
        let state = AppState::new(&config, Arc::new(InMemoryCredentialStore::new())).unwrap();
        let app = build_router(state);
        register_owner(&app, "boss@resto.fr").await;
        let login = login_as(&app, "boss@resto.fr").await;

        let refreshed = send(
            &app,
            "POST",
            "/api/refresh-token",
            &[(REFRESH_COOKIE, login.cookies[REFRESH_COOKIE].as_str())],
            None,
        )
        .await;

        assert_eq!(refreshed.status, StatusCode::OK);
        let rotated = &refreshed.cookies[REFRESH_COOKIE];
        assert_ne!(rotated, &login.cookies[REFRESH_COOKIE]);
        assert_eq!(refreshed.body["refreshToken"], rotated.as_str());
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_with_credentials() {
        let app = build_router(test_state());
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/auth/login")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }
}
