use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::auth::{login_user, logout_user, verify_password};
use crate::error::AppError;
use crate::models::{User, UserView};
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginPayload {
    email: String,
    password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;

    let Some((hash,)) = row else {
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(&payload.password, &hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let user: User = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(user_id = %user.id, "user logged in");
    login_user(&session, user.clone()).await?;

    Ok(Json(UserView::new(user, false)))
}

async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    logout_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
