use std::fmt;

use futures::future::BoxFuture;

use super::store::{ImportStore, ImportTx, StoreError};

/// Runs `work` inside one transaction taken from `store`: commit on `Ok`,
/// rollback on `Err`. The handle is consumed on every path, so the pooled
/// connection goes back before the next unit starts.
pub(crate) async fn with_unit_of_work<T, E, F>(store: &dyn ImportStore, work: F) -> Result<T, E>
where
    T: Send,
    E: From<StoreError> + fmt::Display + Send,
    F: for<'t> FnOnce(&'t mut dyn ImportTx) -> BoxFuture<'t, Result<T, E>> + Send,
{
    let mut tx = store.begin().await?;

    match work(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, cause = %err, "Rollback failed");
            }
            Err(err)
        }
    }
}
