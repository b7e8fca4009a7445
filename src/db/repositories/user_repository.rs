use crate::db::connection::get_connection;
use crate::db::error::RepositoryError;
use crate::db::models::user::{NewUser, User, UserRow};
use crate::db::schema::users;
use crate::db::{CredentialStore, DbPool};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Postgres-backed credential store.
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for UserRepository {
    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = get_connection(&self.pool)?;

        users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    /// Créer un nouvel utilisateur
    fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut conn = get_connection(&self.pool)?;

        let row = diesel::insert_into(users::table)
            .values((
                users::email.eq(&new_user.email),
                users::password_hash.eq(&new_user.password_hash),
                users::role.eq(new_user.role.as_str()),
                users::avatar.eq(&new_user.avatar),
            ))
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut conn)?;

        User::try_from(row)
    }

    fn set_refresh_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut conn = get_connection(&self.pool)?;

        let updated = diesel::update(users::table.filter(users::email.eq(email)))
            .set((
                users::refresh_token_hash.eq(Some(token_hash)),
                users::refresh_token_expires_at.eq(Some(expires_at)),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("user {email}")));
        }
        Ok(())
    }

    fn clear_refresh_token(&self, email: &str) -> Result<(), RepositoryError> {
        let mut conn = get_connection(&self.pool)?;

        diesel::update(users::table.filter(users::email.eq(email)))
            .set((
                users::refresh_token_hash.eq(None::<String>),
                users::refresh_token_expires_at.eq(None::<DateTime<Utc>>),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    fn clear_refresh_token_if(
        &self,
        email: &str,
        expected_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let mut conn = get_connection(&self.pool)?;

        // Compare et écriture dans le même UPDATE
        let updated = diesel::update(
            users::table
                .filter(users::email.eq(email))
                .filter(users::refresh_token_hash.eq(expected_hash)),
        )
        .set((
            users::refresh_token_hash.eq(None::<String>),
            users::refresh_token_expires_at.eq(None::<DateTime<Utc>>),
            users::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(updated == 1)
    }

    fn replace_refresh_token(
        &self,
        email: &str,
        expected_hash: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut conn = get_connection(&self.pool)?;

        let updated = diesel::update(
            users::table
                .filter(users::email.eq(email))
                .filter(users::refresh_token_hash.eq(expected_hash)),
        )
        .set((
            users::refresh_token_hash.eq(Some(token_hash)),
            users::refresh_token_expires_at.eq(Some(expires_at)),
            users::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(updated == 1)
    }
}
