//! Background tasks for backend requests.
//!
//! Each request runs in its own tokio task and reports back through the
//! `AppEvent` channel. Panics are caught and reported instead of silently
//! killing the task.

use crate::app::{App, AppEvent};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

async fn send(tx: &mpsc::Sender<AppEvent>, event: AppEvent) {
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, "Failed to send task result (receiver dropped)");
    }
}

/// Show results for the current query parameters.
///
/// Uses the session cache when possible; otherwise spawns a fetch. `force`
/// drops the cached entry first (explicit refresh / retry).
pub(super) async fn run_query(app: &mut App, event_tx: &mpsc::Sender<AppEvent>, force: bool) {
    if force {
        app.invalidate_current_query();
    } else if app.try_cached_query().await {
        return;
    }
    spawn_query(app, event_tx);
}

/// Spawn a `/query` request for the current parameters.
pub(super) fn spawn_query(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let generation = app.begin_query();
    let key = app.params.cache_key();
    let request = app.params.to_request(Utc::now());
    let client = app.client.clone();
    let tx = event_tx.clone();

    tracing::debug!(
        generation,
        lookback = app.params.lookback.label(),
        query = %request.query,
        "Spawning query task"
    );

    app.query_handle = Some(tokio::spawn(async move {
        match catch_task_panic(client.query(&request)).await {
            Ok(result) => {
                let event = AppEvent::QueryLoaded {
                    generation,
                    key,
                    result: result.map_err(|e| e.to_string()),
                };
                send(&tx, event).await;
            }
            Err(panic_msg) => {
                tracing::error!(error = %panic_msg, "Query task panicked");
                let event = AppEvent::TaskPanicked {
                    task: "query",
                    error: panic_msg,
                };
                send(&tx, event).await;
            }
        }
    }));
}

/// Spawn a `/query_config` request.
pub(super) fn spawn_config_load(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let generation = app.begin_config_load();
    let client = app.client.clone();
    let tx = event_tx.clone();

    tokio::spawn(async move {
        let event = match catch_task_panic(client.query_config()).await {
            Ok(result) => AppEvent::ConfigLoaded {
                generation,
                result: result.map_err(|e| e.to_string()),
            },
            Err(panic_msg) => AppEvent::TaskPanicked {
                task: "config_load",
                error: panic_msg,
            },
        };
        send(&tx, event).await;
    });
}

/// Spawn an `/apply_config` request with the draft configuration.
pub(super) fn spawn_config_apply(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) -> bool {
    let Some(body) = app.begin_apply() else {
        return false;
    };
    let client = app.client.clone();
    let tx = event_tx.clone();

    tokio::spawn(async move {
        let event = match catch_task_panic(client.apply_config(&body)).await {
            Ok(result) => AppEvent::ConfigApplied {
                result: result.map_err(|e| e.to_string()),
            },
            Err(panic_msg) => AppEvent::TaskPanicked {
                task: "config_apply",
                error: panic_msg,
            },
        };
        send(&tx, event).await;
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        assert_eq!(catch_task_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_message() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result, Err("boom".to_string()));
    }
}
