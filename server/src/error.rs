use crate::auth;
use crate::database::DbError;
use crate::posts::PostError;
use crate::resources::OrderingError;
use crate::security::SecurityError;
use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Bad form input: flashed back to the form it came from.
    #[error("{message}")]
    Validation { message: String, redirect_to: String },
    #[error("Not Found")]
    NotFound,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// No admin session. Sends the browser to the login page.
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>, redirect_to: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            redirect_to: redirect_to.into(),
        }
    }

    /// Maps a post-store failure, sending validation problems back to
    /// `redirect_to`.
    pub fn from_post(err: PostError, redirect_to: &str) -> Self {
        match err {
            PostError::MissingField => AppError::validation(err.to_string(), redirect_to),
            PostError::Db(e) => AppError::Sqlite(e),
        }
    }
}

impl From<OrderingError> for AppError {
    fn from(err: OrderingError) -> Self {
        match err {
            OrderingError::MissingField => AppError::validation(err.to_string(), "/admin"),
            OrderingError::NotFound(_) => AppError::NotFound,
            OrderingError::Db(e) => AppError::Sqlite(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation {
                message,
                redirect_to,
            } => (
                AppendHeaders([(header::SET_COOKIE, auth::flash_cookie(&message))]),
                Redirect::to(&redirect_to),
            )
                .into_response(),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            AppError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason).into_response(),
            AppError::Unauthorized => Redirect::to(auth::LOGIN_PATH).into_response(),
            other => {
                error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
