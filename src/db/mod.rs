pub mod connection;
pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod schema;

use chrono::{DateTime, Utc};
use diesel::PgConnection;
use diesel::r2d2::{self, ConnectionManager};

use error::RepositoryError;
use models::user::{NewUser, User};

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Persistent credential records.
///
/// Every write touches a single record keyed by its (already normalized)
/// email, so implementations need no cross-record locking.
pub trait CredentialStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Fails with `UniqueViolation` when the email is taken.
    fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError>;

    /// Replaces any previous session of the record. Fails with `NotFound`
    /// when no record has this email.
    fn set_refresh_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Ends the record's session. Succeeds when there is no session or no
    /// record at all.
    fn clear_refresh_token(&self, email: &str) -> Result<(), RepositoryError>;

    /// Ends the session only while `expected_hash` is still the stored one.
    /// Returns `false` when a newer session (or none) is in place.
    fn clear_refresh_token_if(
        &self,
        email: &str,
        expected_hash: &str,
    ) -> Result<bool, RepositoryError>;

    /// Swaps the stored hash for `token_hash` only while `expected_hash` is
    /// still the stored one. Returns `false` otherwise and writes nothing.
    fn replace_refresh_token(
        &self,
        email: &str,
        expected_hash: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}
