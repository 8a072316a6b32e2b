use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub const NAME_DESCRIPTION_MESSAGE: &str = "The title of the course should not be the description";
pub const NAME_UNIQUE_MESSAGE: &str = "The course title must be unique";
pub const MISSING_REFERENCE_MESSAGE: &str = "Referenced record does not exist";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    /// Message suitable for a caller, without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::Conflict(msg) | AppError::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Constraint failures declared in the schema become client errors; anything
/// else stays a database error.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message();

            if message.contains("name_description_check") {
                return AppError::Conflict(NAME_DESCRIPTION_MESSAGE.to_string());
            }
            if message.contains("courses.name") {
                return AppError::Conflict(NAME_UNIQUE_MESSAGE.to_string());
            }
            if db_err.is_foreign_key_violation() || message.contains("FOREIGN KEY constraint failed") {
                return AppError::BadRequest(MISSING_REFERENCE_MESSAGE.to_string());
            }
            if db_err.is_unique_violation() || db_err.is_check_violation() {
                return AppError::Conflict(message.to_string());
            }
        }
        AppError::Database(err)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Migration(e) => {
                error!("migration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Configuration(msg) => {
                error!("configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
