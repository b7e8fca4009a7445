use serde::{Deserialize, Serialize};

// -------- REQUEST DTOs --------
#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginRequest {
    pub email: String,
    pub password: String, // Plain text
}

/// Owner sign-up. Creates the credential record only; restaurant details are
/// handled by the back-office CRUD layer.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RegisterOwnerRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateManagerRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_uses_camel_case() {
        let req: RegisterOwnerRequest = serde_json::from_str(
            r#"{"email":"a@x.com","password":"secret123","confirmPassword":"secret123"}"#,
        )
        .unwrap();
        assert_eq!(req.confirm_password, "secret123");
        assert!(req.avatar.is_none());
    }
}
