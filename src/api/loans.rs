//! Library service endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::SecondsFormat;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::api::{
    ApiJson, BorrowBookRequest, BorrowBookResponse, Empty, UpdateSimulatedTimeRequest,
    BORROW_BOOK_PATH, SIMULATED_TIME_PATH, STATUS_PATH,
};
use crate::core::ledger::{BorrowBookCommand, LoanLedger};
use crate::core::time_control::TimeControl;
use crate::domain::model::{BookId, BorrowerId};
use crate::domain::ports::LoanStore;
use crate::utils::error::Result;
use crate::utils::validation::parse_uuid;

/// Shared state for the library service handlers.
pub struct LibraryState<S: LoanStore> {
    pub service_name: String,
    pub ledger: LoanLedger<S>,
    pub time_control: TimeControl,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub simulated_time: bool,
    pub now: String,
}

pub fn router<S: LoanStore + 'static>(state: Arc<LibraryState<S>>) -> Router {
    Router::new()
        .route(STATUS_PATH, get(status::<S>))
        .route(BORROW_BOOK_PATH, post(borrow_book::<S>))
        .route(SIMULATED_TIME_PATH, post(update_simulated_time::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn borrow_book<S: LoanStore + 'static>(
    State(state): State<Arc<LibraryState<S>>>,
    ApiJson(request): ApiJson<BorrowBookRequest>,
) -> Result<Json<BorrowBookResponse>> {
    let cmd = BorrowBookCommand {
        borrower_id: BorrowerId(parse_uuid("borrower_id", &request.borrower_id)?),
        book_id: BookId(parse_uuid("book_id", &request.book_id)?),
    };

    let due_date = state.ledger.borrow_book(cmd).await?;
    Ok(Json(BorrowBookResponse {
        due_date: due_date.format("%Y-%m-%d").to_string(),
    }))
}

async fn update_simulated_time<S: LoanStore + 'static>(
    State(state): State<Arc<LibraryState<S>>>,
    ApiJson(request): ApiJson<UpdateSimulatedTimeRequest>,
) -> Result<Json<Empty>> {
    state.time_control.update_simulated_time(&request.timestamp)?;
    Ok(Json(Empty {}))
}

async fn status<S: LoanStore + 'static>(
    State(state): State<Arc<LibraryState<S>>>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        service: state.service_name.clone(),
        simulated_time: state.time_control.is_simulated(),
        now: state
            .time_control
            .now()
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}
