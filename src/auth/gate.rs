//! Request gate: cookie-based authentication and role checks.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use restaurant_auth_api::Role;

use crate::app::AppState;
use crate::auth::cookies::ACCESS_COOKIE;
use crate::auth::jwt::{Identity, TokenError};
use crate::error::AppError;

/// Roles allowed on owner-only routes.
pub const OWNER_ONLY: &[Role] = &[Role::Owner];
/// Any authenticated back-office user.
pub const STAFF: &[Role] = &[Role::Owner, Role::Manager];

/// Verifies the `accessToken` cookie and attaches its [`Identity`] to the
/// request. The `Authorization` header is ignored.
///
/// An expired token answers 401 `TOKEN_EXPIRED` so the client knows a
/// refresh may help; any other bad token is a 403.
pub async fn verify_token(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(ACCESS_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::unauthenticated("Unauthorized, no token."))?;

    let claims = state
        .tokens
        .verify_access_token(token)
        .map_err(|e| match e {
            TokenError::Expired => AppError::TokenExpired,
            _ => AppError::forbidden("Invalid token."),
        })?;

    request.extensions_mut().insert(claims.identity());

    Ok(next.run(request).await)
}

/// Lets the request through only when the attached identity has one of the
/// `allowed` roles. Must sit behind [`verify_token`].
pub async fn verify_roles(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| AppError::unauthenticated("Unauthorized"))?;

    if !allowed.contains(&identity.role) {
        tracing::debug!(email = %identity.email, role = %identity.role, "role not allowed on route");
        return Err(AppError::forbidden("Access denied"));
    }

    Ok(next.run(request).await)
}
