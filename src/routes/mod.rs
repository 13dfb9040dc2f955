use rocket::tokio::task;

use crate::error::AppError;

pub mod admin;
pub mod api;
pub mod auth;
pub mod public;

/// Run backend work on Rocket's blocking pool. Store, storage and auth
/// adapters all block (rusqlite, reqwest's blocking client).
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Backend {
            action: "complete request",
            message: e.to_string(),
        })?
}
