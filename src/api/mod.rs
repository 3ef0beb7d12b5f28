//! HTTP/JSON rendition of the RPC surfaces.
//!
//! - Library service: `BorrowBook`, `UpdateSimulatedTime` and a status endpoint.
//! - Coordinator: `SetTime` and `AdvanceBy`.
//!
//! Failures carry an `{code, message}` body whose code names the RPC status.

pub mod coordinator;
pub mod loans;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::utils::error::{LoanError, RpcCode};

pub const BORROW_BOOK_PATH: &str = "/v1/loans/borrow";
pub const SIMULATED_TIME_PATH: &str = "/v1/simulated-time";
pub const STATUS_PATH: &str = "/v1/status";
pub const SET_TIME_PATH: &str = "/v1/time/set";
pub const ADVANCE_BY_PATH: &str = "/v1/time/advance";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowBookRequest {
    pub borrower_id: String,
    pub book_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowBookResponse {
    /// `YYYY-MM-DD`.
    pub due_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSimulatedTimeRequest {
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTimeRequest {
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceByRequest {
    pub seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceByResponse {
    pub new_timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// `Json` body extractor whose rejections (bad syntax, wrong field types,
/// missing fields, wrong content type) answer `INVALID_ARGUMENT`.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = LoanError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(LoanError::validation("request body", rejection.body_text())),
        }
    }
}

impl From<RpcCode> for StatusCode {
    fn from(code: RpcCode) -> Self {
        match code {
            RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
            RpcCode::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            RpcCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            RpcCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for LoanError {
    fn into_response(self) -> Response {
        let code = self.rpc_code();
        let body = ErrorBody {
            code: code.as_str().to_string(),
            message: self.to_string(),
        };
        (StatusCode::from(code), Json(body)).into_response()
    }
}
