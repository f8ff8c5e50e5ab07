//! Defines the trigger and probe routes.
//!
//! - `POST /events`        -> object-created notification, returns `{"statusCode":200}`
//! - `POST /events/report` -> same pipeline, returns the structured report
//! - `GET  /healthz`       -> liveness
//! - `GET  /readyz`        -> storage readiness

use crate::{
    handlers::{
        event_handlers::{handle_event, handle_event_report},
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router. Shared state (`AppState`) is attached by the caller.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/events", post(handle_event))
        .route("/events/report", post(handle_event_report))
}
