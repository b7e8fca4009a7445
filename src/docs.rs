use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::refresh_token,
        crate::handlers::auth::me,
        crate::handlers::accounts::register,
        crate::handlers::accounts::create_manager,
    ),
    components(schemas(
        restaurant_auth_api::LoginRequest,
        restaurant_auth_api::RegisterOwnerRequest,
        restaurant_auth_api::CreateManagerRequest,
        restaurant_auth_api::AuthUser,
        restaurant_auth_api::LoginResponse,
        restaurant_auth_api::RefreshTokenResponse,
        restaurant_auth_api::SessionResponse,
        restaurant_auth_api::MessageResponse,
        restaurant_auth_api::ErrorResponse,
        restaurant_auth_api::Role,
        crate::handlers::health::HealthResponse,
    )),
    tags(
        (name = "Health"),
        (name = "Auth"),
        (name = "Accounts"),
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/auth/login",
            "/api/auth/logout",
            "/api/refresh-token",
            "/api/auth/me",
            "/api/register",
            "/api/managers",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
