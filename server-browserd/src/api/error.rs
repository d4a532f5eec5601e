use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use shared::types::StatusResponse;
use crate::error::StoreError;

/// Everything a handler can fail with, rendered as a `{status, message}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("You are banned")]
    Banned,

    #[error("Invalid admin key")]
    InvalidAdminKey,

    #[error("{0}")]
    InvalidJson(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("could not determine client address")]
    NoClientAddress,
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Store(StoreError::NotFound) => (StatusCode::NOT_FOUND, "not_registered"),
            ApiError::Store(StoreError::Forbidden) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Store(StoreError::InvalidInput(_)) => (StatusCode::BAD_REQUEST, "invalid_ip"),
            ApiError::Store(StoreError::MissingCredential) => (StatusCode::BAD_REQUEST, "no_key"),
            ApiError::Banned | ApiError::InvalidAdminKey => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::InvalidJson(_) => (StatusCode::BAD_REQUEST, "invalid_json_body"),
            ApiError::MissingField(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::NoClientAddress => (StatusCode::BAD_REQUEST, "no_client_address"),
        }
    }
}

impl ApiError {
    /// Maps a store error on an admin-keyed list, where the only secret is the
    /// admin key.
    pub fn from_admin(error: StoreError) -> Self {
        match error {
            StoreError::Forbidden => ApiError::InvalidAdminKey,
            other => ApiError::Store(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, status) = self.status();
        let body = StatusResponse {
            status: status.to_string(),
            message: self.to_string(),
        };
        (code, Json(body)).into_response()
    }
}
