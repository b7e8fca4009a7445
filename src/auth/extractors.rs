use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::jwt::Identity;
use crate::error::AppError;

/// Extracteur pour les routes protégées.
/// Lit l'`Identity` posée par le middleware `verify_token`; absente, la
/// requête est rejetée en 401.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| AppError::unauthenticated("Unauthorized"))
    }
}
