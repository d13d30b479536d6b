use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use poker_engine::EngineError;
use poker_store::StoreError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub const NOT_FOUND: &str = "NOT_FOUND";
pub const INVALID_STATE: &str = "INVALID_STATE";
pub const INVALID_INPUT: &str = "INVALID_INPUT";
pub const CONFLICT: &str = "CONFLICT";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Error body returned by every endpoint: `{ "error": { code, message } }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, INVALID_INPUT, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let message = e.to_string();
        match e {
            ServiceError::Engine(EngineError::NotFound(_))
            | ServiceError::Store(StoreError::NotFound(_)) => {
                Self::new(StatusCode::NOT_FOUND, NOT_FOUND, message)
            }
            ServiceError::Engine(EngineError::InvalidState(_)) => {
                Self::new(StatusCode::BAD_REQUEST, INVALID_STATE, message)
            }
            ServiceError::Engine(EngineError::InvalidInput(_)) => Self::invalid_input(message),
            ServiceError::Store(StoreError::Conflict(_)) => {
                Self::new(StatusCode::CONFLICT, CONFLICT, message)
            }
            ServiceError::Store(err) => {
                tracing::error!(error = %err, "store failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: &self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
