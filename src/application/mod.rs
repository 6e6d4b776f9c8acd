pub mod catalog_service;
pub mod checkout_service;
pub mod content_service;
pub mod order_service;
pub mod polling;

use crate::domain::errors::DomainError;

/// Runs synchronous repository work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
}
