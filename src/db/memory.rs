use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::db::CredentialStore;
use crate::db::error::RepositoryError;
use crate::db::models::user::{NewUser, User};

/// Credential store kept in process memory.
///
/// Used when no `DATABASE_URL` is configured in development, and by tests.
/// Each operation locks only the shard holding the record.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, User>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        match self.users.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::UniqueViolation(format!(
                "email {} already exists",
                new_user.email
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = User {
                    id: Uuid::new_v4(),
                    email: new_user.email.clone(),
                    password_hash: new_user.password_hash.clone(),
                    role: new_user.role,
                    refresh_token_hash: None,
                    refresh_token_expires_at: None,
                    avatar: new_user.avatar.clone(),
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    fn set_refresh_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut user = self
            .users
            .get_mut(email)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {email}")))?;

        user.refresh_token_hash = Some(token_hash.to_string());
        user.refresh_token_expires_at = Some(expires_at);
        user.updated_at = Utc::now();
        Ok(())
    }

    fn clear_refresh_token(&self, email: &str) -> Result<(), RepositoryError> {
        if let Some(mut user) = self.users.get_mut(email) {
            user.refresh_token_hash = None;
            user.refresh_token_expires_at = None;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    fn clear_refresh_token_if(
        &self,
        email: &str,
        expected_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let Some(mut user) = self.users.get_mut(email) else {
            return Ok(false);
        };
        if user.refresh_token_hash.as_deref() != Some(expected_hash) {
            return Ok(false);
        }

        user.refresh_token_hash = None;
        user.refresh_token_expires_at = None;
        user.updated_at = Utc::now();
        Ok(true)
    }

    fn replace_refresh_token(
        &self,
        email: &str,
        expected_hash: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let Some(mut user) = self.users.get_mut(email) else {
            return Ok(false);
        };
        if user.refresh_token_hash.as_deref() != Some(expected_hash) {
            return Ok(false);
        }

        user.refresh_token_hash = Some(token_hash.to_string());
        user.refresh_token_expires_at = Some(expires_at);
        user.updated_at = Utc::now();
        Ok(true)
    }
}
