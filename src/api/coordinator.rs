//! Coordinator endpoints: `SetTime` and `AdvanceBy`, fanned out to every participant.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use chrono::SecondsFormat;
use tower_http::trace::TraceLayer;

use crate::api::{
    AdvanceByRequest, AdvanceByResponse, ApiJson, Empty, SetTimeRequest, ADVANCE_BY_PATH,
    SET_TIME_PATH,
};
use crate::core::coordinator::TimeCoordinator;
use crate::utils::error::Result;

pub fn router(coordinator: Arc<TimeCoordinator>) -> Router {
    Router::new()
        .route(SET_TIME_PATH, post(set_time))
        .route(ADVANCE_BY_PATH, post(advance_by))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

async fn set_time(
    State(coordinator): State<Arc<TimeCoordinator>>,
    ApiJson(request): ApiJson<SetTimeRequest>,
) -> Result<Json<Empty>> {
    coordinator.set_time_rfc3339(&request.timestamp).await?;
    Ok(Json(Empty {}))
}

async fn advance_by(
    State(coordinator): State<Arc<TimeCoordinator>>,
    ApiJson(request): ApiJson<AdvanceByRequest>,
) -> Result<Json<AdvanceByResponse>> {
    let new_time = coordinator.advance_by(request.seconds).await?;
    Ok(Json(AdvanceByResponse {
        new_timestamp: new_time.to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}
