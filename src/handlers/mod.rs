pub mod accounts;
pub mod auth;
pub mod health;

use crate::error::AppError;

/// Runs bcrypt and store calls on the blocking pool, off the async workers.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::internal(format!("blocking task failed: {e}")))?
}
