//! Runs orchestrator flows on their own task.
//!
//! Axum drops a handler future when the client disconnects. Dropping a
//! flow halfway through a session write would leave storage and the
//! issued tokens disagreeing, so the flow runs detached and is told to
//! stop through a [`CancellationToken`] instead. The flow decides where it
//! is still safe to stop.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use adminhub_core::{AppError, AppResult};

/// Spawns `flow` and waits for it.
///
/// The token handed to the flow is cancelled when the caller is dropped or
/// when `timeout` elapses. After a timeout the flow is still awaited, so a
/// flow past its commit point finishes and its result is returned.
pub async fn run_flow<T, F, Fut>(timeout: Duration, flow: F) -> AppResult<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let mut task = tokio::spawn(flow(cancel.clone()));

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::time::sleep(timeout) => {
            warn!(timeout_secs = timeout.as_secs(), "Auth flow exceeded its deadline, cancelling");
            cancel.cancel();
            task.await
        }
    };

    joined.map_err(|e| AppError::internal(format!("Auth flow task failed: {e}")))?
}
