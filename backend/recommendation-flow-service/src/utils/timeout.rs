// ============================================
// Upstream Budgets
// ============================================
// Every generator call in fan-in and every collector signal lookup runs
// under a fixed budget. Elapsed and failed calls are reported separately:
// callers degrade a timeout to an empty source but may escalate errors.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Operation timed out after {0:?}")]
    Elapsed(Duration),
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Bound an infallible future, such as a store lookup whose own error is handled by the caller.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    timeout(duration, future)
        .await
        .map_err(|_| TimeoutError::Elapsed(duration))
}

/// Bound a fallible future, flattening its error into `OperationFailed`.
pub async fn with_timeout_result<F, T, E>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        // `{:#}` keeps the whole anyhow context chain on one line
        Ok(Err(e)) => Err(TimeoutError::OperationFailed(format!("{:#}", e))),
        Err(_) => Err(TimeoutError::Elapsed(duration)),
    }
}
