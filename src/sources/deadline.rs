//! Timeout race shared by the data sources.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Run `fut` against a deadline. Whichever settles first decides the outcome;
/// a future that loses the race is dropped, so its completion can never be
/// observed by the caller.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(AppError::Timeout(limit)),
    }
}
