use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use restaurant_auth_api::{AuthUser, CreateManagerRequest, ErrorResponse, RegisterOwnerRequest};

use crate::app::AppState;
use crate::auth::jwt::Identity;
use crate::error::AppError;
use crate::handlers::run_blocking;
use crate::response::AppResponse;

/// POST /api/register
/// Inscription d'un propriétaire
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "Accounts",
    request_body = RegisterOwnerRequest,
    responses(
        (status = 201, description = "Owner created", body = AuthUser),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterOwnerRequest>, JsonRejection>,
) -> Result<AppResponse<AuthUser>, AppError> {
    let Json(payload) = payload?;
    let accounts = state.accounts.clone();
    let user = run_blocking(move || accounts.register_owner(payload)).await?;
    Ok(AppResponse::created(AuthUser::from(&user)))
}

/// POST /api/managers
/// Création d'un manager (propriétaires uniquement)
#[utoipa::path(
    post,
    path = "/api/managers",
    tag = "Accounts",
    request_body = CreateManagerRequest,
    responses(
        (status = 201, description = "Manager created", body = AuthUser),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller is not an owner", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
    )
)]
pub async fn create_manager(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<CreateManagerRequest>, JsonRejection>,
) -> Result<AppResponse<AuthUser>, AppError> {
    let Json(payload) = payload?;
    let accounts = state.accounts.clone();
    let user = run_blocking(move || accounts.create_manager(&identity.email, payload)).await?;
    Ok(AppResponse::created(AuthUser::from(&user)))
}
