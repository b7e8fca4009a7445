// src/handlers/auth.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use axum_extra::extract::CookieJar;
use restaurant_auth_api::{
    AuthUser, ErrorResponse, LoginRequest, LoginResponse, MessageResponse, RefreshTokenResponse,
    SessionResponse,
};

use crate::app::AppState;
use crate::auth::cookies::REFRESH_COOKIE;
use crate::auth::jwt::Identity;
use crate::error::AppError;
use crate::handlers::run_blocking;
use crate::response::AppResponse;

/// POST /api/auth/login
/// Connexion d'un utilisateur
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated, both cookies set", body = LoginResponse),
        (status = 400, description = "Malformed email or password", body = ErrorResponse),
        (status = 401, description = "Invalid password", body = ErrorResponse),
        (status = 404, description = "No user with this email", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<AppResponse<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let sessions = state.sessions.clone();
    let session = run_blocking(move || sessions.login(&payload.email, &payload.password)).await?;

    let jar = jar
        .add(state.cookies.access_cookie(&session.access_token))
        .add(state.cookies.refresh_cookie(&session.refresh_token));

    Ok(AppResponse::ok(LoginResponse {
        message: "Authenticated successfully !".to_string(),
        auth_user: AuthUser::from(&session.user),
        access_token: session.access_token,
        refresh_token: session.refresh_token,
    })
    .with_cookies(jar))
}

/// POST /api/auth/logout
/// Déconnexion: invalide la session et efface les cookies
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Logged out, both cookies cleared", body = MessageResponse),
        (status = 401, description = "No access cookie or token expired", body = ErrorResponse),
        (status = 403, description = "Invalid access token", body = ErrorResponse),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
) -> Result<AppResponse<MessageResponse>, AppError> {
    let sessions = state.sessions.clone();
    run_blocking(move || sessions.logout(&identity)).await?;

    let jar = jar
        .add(state.cookies.clear_access_cookie())
        .add(state.cookies.clear_refresh_cookie());

    Ok(AppResponse::ok(MessageResponse::new("Logged out successfully.")).with_cookies(jar))
}

/// POST /api/refresh-token
/// Rafraîchissement de l'access token à partir du cookie `refreshToken`
#[utoipa::path(
    post,
    path = "/api/refresh-token",
    tag = "Auth",
    responses(
        (status = 200, description = "New access token, access cookie reset", body = RefreshTokenResponse),
        (status = 401, description = "Missing, invalid or expired refresh token", body = ErrorResponse),
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<AppResponse<RefreshTokenResponse>, AppError> {
    let presented = jar.get(REFRESH_COOKIE).map(|cookie| cookie.value().to_string());
    let sessions = state.sessions.clone();
    let refreshed = run_blocking(move || sessions.refresh(presented.as_deref())).await?;

    let mut jar = jar.add(state.cookies.access_cookie(&refreshed.access_token));
    if let Some(rotated) = &refreshed.refresh_token {
        jar = jar.add(state.cookies.refresh_cookie(rotated));
    }

    Ok(AppResponse::ok(RefreshTokenResponse {
        access_token: refreshed.access_token,
        refresh_token: refreshed.refresh_token,
    })
    .with_cookies(jar))
}

/// GET /api/auth/me
/// Identité portée par l'access token courant
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current identity", body = SessionResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Invalid token or role", body = ErrorResponse),
    )
)]
pub async fn me(identity: Identity) -> AppResponse<SessionResponse> {
    AppResponse::ok(SessionResponse {
        email: identity.email,
        role: identity.role,
    })
}
