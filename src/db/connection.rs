use super::{DbConnection, DbPool};
use crate::db::error::RepositoryError;
use anyhow::{Result, anyhow};
use diesel::PgConnection;
use diesel::r2d2::ConnectionManager;

/// Builds the r2d2 pool. Connections are opened lazily so startup does not
/// block on the database being reachable.
pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    diesel::r2d2::Pool::builder()
        .max_size(max_size)
        .min_idle(Some(0))
        .build(manager)
        .map_err(|e| anyhow!("Failed to create database pool: {e}"))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection, RepositoryError> {
    pool.get().map_err(RepositoryError::from)
}
