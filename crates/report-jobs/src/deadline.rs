//! Bounded backend calls

use report_core::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Run `future`, failing with [`Error::Timeout`] once `bound` elapses
pub(crate) async fn within<T, F>(operation: &str, bound: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(bound, future)
        .await
        .map_err(|_| Error::timeout(operation, bound))?
}
