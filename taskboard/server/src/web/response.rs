use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::storage::Stored;

/// JSON envelope for successful responses: `{status, data}`.
#[derive(Debug, Serialize, PartialEq)]
pub struct DataResponse<T> {
    pub status: u16,
    pub data: T,
}

impl<T> From<Stored<T>> for DataResponse<T> {
    fn from(stored: Stored<T>) -> Self {
        Self {
            status: stored.status().as_u16(),
            data: stored.into_data(),
        }
    }
}

impl<T: Serialize> IntoResponse for DataResponse<T> {
    fn into_response(self) -> Response {
        (status_code(self.status), Json(self)).into_response()
    }
}

/// JSON envelope for errors: `{status, error}`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            error: error.into(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (status_code(self.status), Json(self)).into_response()
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
