//! Trigger endpoints.
//!
//! - POST /events         -> runs the pipeline, always `{"statusCode": 200}`
//! - POST /events/report  -> runs the pipeline, returns the full report
//!
//! Only an unparseable notification is rejected; everything that happens
//! inside the pipeline is reported as handled.

use crate::{
    errors::AppError,
    models::{
        event::NotificationEvent,
        report::{PipelineReport, TriggerResponse},
    },
    state::AppState,
};
use axum::{Json, extract::State, extract::rejection::JsonRejection};

/// `POST /events`
pub async fn handle_event(
    State(state): State<AppState>,
    payload: Result<Json<NotificationEvent>, JsonRejection>,
) -> Result<Json<TriggerResponse>, AppError> {
    let Json(notification) = payload.map_err(|rej| AppError::bad_request(rej.body_text()))?;
    let report = state.pipeline.handle_notification(&notification).await;
    Ok(Json(report.trigger_response()))
}

/// `POST /events/report`
pub async fn handle_event_report(
    State(state): State<AppState>,
    payload: Result<Json<NotificationEvent>, JsonRejection>,
) -> Result<Json<PipelineReport>, AppError> {
    let Json(notification) = payload.map_err(|rej| AppError::bad_request(rej.body_text()))?;
    Ok(Json(state.pipeline.handle_notification(&notification).await))
}
