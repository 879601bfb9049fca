//! Shared utility functions.

use std::time::Duration;

use tokio::time::timeout;

use crate::core::Task;
use crate::{plog_debug, Error, Result};

/// Wait for a task, interrupting it if it does not finish within `duration`.
///
/// On expiry the task is interrupted and awaited to settlement, so its
/// cleanup has run by the time `Error::Timeout` is returned.
pub async fn with_timeout<T>(task: &Task<T>, duration: Duration) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    match timeout(duration, task.get()).await {
        Ok(outcome) => outcome,
        Err(_) => {
            plog_debug!("{} timed out after {:?}, interrupting", task.id(), duration);
            task.interrupt().await;
            Err(Error::Timeout(duration))
        }
    }
}
