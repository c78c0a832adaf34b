use std::{future::Future, time::Duration};

use log::*;
use nexus_engine::StoreError;
use tokio::time::timeout;

use crate::errors::ServerError;

/// Runs a store call with an upper bound on how long it may take.
///
/// `operation` names the call and the ids involved, and is used in log messages. Storage failures are logged here
/// before being converted into an opaque [`ServerError::BackendError`]. A call that runs out of time is dropped, which
/// rolls back any transaction it had open.
pub async fn bounded<T, F>(limit: Duration, operation: &str, call: F) -> Result<T, ServerError>
where F: Future<Output = Result<T, StoreError>> {
    match timeout(limit, call).await {
        Ok(result) => result.map_err(|e| log_store_failure(operation, e)),
        Err(_) => {
            error!("💻️ {operation} did not complete within {}s and was abandoned", limit.as_secs_f32());
            Err(ServerError::BackendError("The request timed out.".into()))
        },
    }
}

fn log_store_failure(operation: &str, e: StoreError) -> ServerError {
    match &e {
        StoreError::DatabaseError(msg) => error!("💻️ {operation} failed with a storage error. {msg}"),
        _ => debug!("💻️ {operation} was refused. {e}"),
    }
    ServerError::from(e)
}
