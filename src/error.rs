use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::models::RecipeList;
use crate::validation::RecipeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Recipe(#[from] RecipeError),
    #[error("{0}")]
    InvalidField(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Recipe with ID {0} does not exist")]
    RecipeNotFound(String),
    #[error("User with ID {0} does not exist")]
    UserNotFound(String),
    #[error("Recipe already added to {0}")]
    AlreadyInList(RecipeList),
    #[error("Recipe was not added to {0}")]
    NotInList(RecipeList),
    #[error("Cannot follow yourself")]
    SelfFollow,
    #[error("You already follow this author")]
    AlreadyFollowing,
    #[error("Subscription does not exist")]
    NotFollowing,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Authentication credentials were not provided")]
    Unauthorized,
    #[error("You do not have permission to perform this action")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl AppError {
    /// Stable, machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Recipe(e) => e.kind(),
            AppError::InvalidField(_) => "InvalidField",
            AppError::Conflict(_) => "Conflict",
            AppError::RecipeNotFound(_) => "RecipeNotFound",
            AppError::UserNotFound(_) => "UserNotFound",
            AppError::AlreadyInList(_) => "AlreadyInList",
            AppError::NotInList(_) => "NotInList",
            AppError::SelfFollow => "SelfFollow",
            AppError::AlreadyFollowing => "AlreadyFollowing",
            AppError::NotFollowing => "NotFollowing",
            AppError::InvalidCredentials => "InvalidCredentials",
            AppError::Unauthorized => "Unauthorized",
            AppError::Forbidden => "Forbidden",
            AppError::NotFound => "NotFound",
            AppError::Database(_)
            | AppError::Template(_)
            | AppError::Session(_)
            | AppError::Io(_)
            | AppError::PasswordHash(_) => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::RecipeNotFound(_) | AppError::UserNotFound(_) | AppError::NotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::Database(_)
            | AppError::Template(_)
            | AppError::Session(_)
            | AppError::Io(_)
            | AppError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            tracing::error!("{self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: self.kind(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::InvalidField(e.to_string())
    }
}

/// Maps a unique-constraint violation to `conflict`, passing other errors through.
pub fn on_unique_violation(e: sqlx::Error, conflict: AppError) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict,
        _ => AppError::Database(e),
    }
}
