//! Request-scoped failures and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use patient_records_core::{DbError, ErrorKind, ValidationError};
use thiserror::Error;

use crate::views;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Db(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to the user; storage internals stay in the log.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Db(DbError::Validation(e)) => e.to_string(),
            AppError::Db(DbError::NotFound(uhid)) => format!("No patient with UHID {uhid}"),
            AppError::Db(DbError::Constraint(msg)) => format!("Could not save patient: {msg}"),
            _ => "The patient store is unavailable. Please try again.".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self);
        } else {
            tracing::debug!(%status, "request rejected: {}", self);
        }
        (status, Html(views::error_page(status, &self.public_message()))).into_response()
    }
}
