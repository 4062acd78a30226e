//! API error type shared by every handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid credentials")]
    AuthenticationFailure,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Location not captured yet")]
    LocationUnavailable,

    #[error("Site access denied: {0}")]
    SiteAccessDenied(String),

    #[error("A photo is required for punch {0}")]
    PhotoMissing(&'static str),

    #[error("{0}")]
    DuplicateAction(String),

    #[error("Remark cannot be empty")]
    EmptyRemark,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::AuthenticationFailure => (StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILED"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::LocationUnavailable => {
                (StatusCode::UNPROCESSABLE_ENTITY, "LOCATION_UNAVAILABLE")
            }
            ApiError::SiteAccessDenied(_) => (StatusCode::FORBIDDEN, "SITE_ACCESS_DENIED"),
            ApiError::PhotoMissing(_) => (StatusCode::UNPROCESSABLE_ENTITY, "PHOTO_MISSING"),
            ApiError::DuplicateAction(_) => (StatusCode::CONFLICT, "DUPLICATE_ACTION"),
            ApiError::EmptyRemark => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_REMARK"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Store(StoreError::Duplicate) => (StatusCode::CONFLICT, "DUPLICATE_ACTION"),
            ApiError::Store(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { error, code })).into_response()
    }
}
