//! Route definitions for service-to-service callbacks. No authentication.
//!
//! ```text
//! PUT    /tasks/{id}      update_task_status
//! ```

use axum::routing::put;
use axum::Router;

use crate::handlers::internal;
use crate::state::AppState;

/// Internal routes, mounted at `/internal`.
pub fn router() -> Router<AppState> {
    Router::new().route("/tasks/{id}", put(internal::update_task_status))
}
