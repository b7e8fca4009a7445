use std::sync::Arc;

use restaurant_auth_api::{CreateManagerRequest, RegisterOwnerRequest, Role};

use crate::auth::password::PasswordHasher;
use crate::auth::validation::validate_credentials;
use crate::db::CredentialStore;
use crate::db::error::RepositoryError;
use crate::db::models::user::{NewUser, User};
use crate::error::AppError;

/// Creation of credential records. New records never start with a session.
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    passwords: Arc<dyn PasswordHasher>,
}

impl AccountService {
    pub fn new(store: Arc<dyn CredentialStore>, passwords: Arc<dyn PasswordHasher>) -> Self {
        Self { store, passwords }
    }

    /// Inscription d'un propriétaire
    pub fn register_owner(&self, payload: RegisterOwnerRequest) -> Result<User, AppError> {
        let email = validate_credentials(&payload.email, &payload.password)?;
        if payload.password != payload.confirm_password {
            return Err(AppError::validation("\"confirmPassword\" must match \"password\""));
        }

        let user = self.create(email, &payload.password, Role::Owner, payload.avatar)?;
        tracing::info!(email = %user.email, "owner registered");
        Ok(user)
    }

    /// Création d'un manager par un propriétaire
    pub fn create_manager(
        &self,
        created_by: &str,
        payload: CreateManagerRequest,
    ) -> Result<User, AppError> {
        let email = validate_credentials(&payload.email, &payload.password)?;

        let user = self.create(email, &payload.password, Role::Manager, None)?;
        tracing::info!(email = %user.email, created_by, "manager created");
        Ok(user)
    }

    fn create(
        &self,
        email: String,
        password: &str,
        role: Role,
        avatar: Option<String>,
    ) -> Result<User, AppError> {
        if self.store.find_by_email(&email)?.is_some() {
            return Err(AppError::duplicate("Email already in use."));
        }

        let new_user = NewUser {
            email,
            password_hash: self.passwords.hash(password)?,
            role,
            avatar,
        };

        // Un insert concurrent peut encore gagner la course
        self.store.create(&new_user).map_err(|e| match e {
            RepositoryError::UniqueViolation(_) => AppError::duplicate("Email already in use."),
            other => other.into(),
        })
    }
}
