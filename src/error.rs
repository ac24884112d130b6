use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Selection is empty")]
    EmptySelection,
    #[error("Selection is stale: {0}")]
    StaleSelection(String),
    #[error("Item is already converted")]
    AlreadyConverted,
    #[error("No bid ceiling set")]
    MissingBidCeiling,
}

impl AppError {
    /// Stable machine-readable code, independent of the human message.
    fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidState(_) => "invalid_state",
            AppError::EmptySelection => "empty_selection",
            AppError::StaleSelection(_) => "stale_selection",
            AppError::AlreadyConverted => "already_converted",
            AppError::MissingBidCeiling => "missing_bid_ceiling",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidState(_)
            | AppError::StaleSelection(_)
            | AppError::AlreadyConverted => StatusCode::CONFLICT,
            AppError::EmptySelection | AppError::MissingBidCeiling => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::catalog::CatalogError> for AppError {
    fn from(err: crate::catalog::CatalogError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::db::ConvertError> for AppError {
    fn from(err: crate::db::ConvertError) -> Self {
        use crate::db::ConvertError;
        match err {
            ConvertError::NotFound => AppError::NotFound("item not found".to_string()),
            ConvertError::AlreadyConverted => AppError::AlreadyConverted,
            ConvertError::InvalidState(status) => AppError::InvalidState(format!(
                "item is in state {}, conversion requires ready",
                status.as_str()
            )),
            ConvertError::StaleSelection => AppError::StaleSelection(
                "a selected match is no longer confirmed".to_string(),
            ),
            ConvertError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
