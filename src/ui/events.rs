//! Application event handling.
//!
//! Processes results of background backend requests.

use crate::app::{App, AppEvent, LoadState};

/// Handle application events from background tasks.
pub(super) async fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::QueryLoaded {
            generation,
            key,
            result,
        } => {
            let failed = result.is_err();
            app.apply_query_result(generation, key, result).await;
            if failed && generation == app.query_generation {
                app.set_status("Query failed, press r to retry");
            }
        }
        AppEvent::ConfigLoaded { generation, result } => {
            app.apply_config_loaded(generation, result);
        }
        AppEvent::ConfigApplied { result } => {
            app.apply_config_applied(result);
        }
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error, "Background task panicked");
            let failed = LoadState::Failed(format!("Internal error: {}", error));
            match task {
                "query" => app.load_state = failed,
                "config_load" => app.settings.load_state = failed,
                "config_apply" => app.settings.applying = false,
                _ => {}
            }
            app.set_status(format!("Internal error in {} task", task));
        }
    }
    app.needs_redraw = true;
}
