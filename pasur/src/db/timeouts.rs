//! Database query timeout helpers
//!
//! Every repository query goes through one of these so a stalled database
//! can never wedge a session actor.

use std::{future::Future, time::Duration};
use tokio::time::timeout;

use super::repository::{RepositoryError, RepositoryResult};

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for schema setup (30 seconds)
pub const SCHEMA_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute a query with timeout
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> RepositoryResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(RepositoryError::Database(e)),
        Err(_) => Err(RepositoryError::Timeout(duration)),
    }
}

/// Execute a query with default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> RepositoryResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
