use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthUser, MaybeUser};
use crate::error::{on_unique_violation, AppError};
use crate::models::{Recipe, RecipeSummary, User, UserView};
use crate::pagination::{Page, PageParams};
use crate::relations;
use crate::validation::validate_username;
use crate::AppState;

#[derive(Deserialize, Validate)]
pub struct RegisterPayload {
    #[validate(email, length(max = 254))]
    email: String,
    username: String,
    #[validate(length(min = 1, max = 150))]
    first_name: String,
    #[validate(length(min = 1, max = 150))]
    last_name: String,
    #[validate(length(min = 1, max = 150))]
    password: String,
}

#[derive(Deserialize, Validate)]
pub struct SetPasswordPayload {
    current_password: String,
    #[validate(length(min = 1, max = 150))]
    new_password: String,
}

#[derive(Deserialize)]
pub struct SubscriptionParams {
    page: Option<u32>,
    limit: Option<u32>,
    recipes_limit: Option<String>,
}

impl SubscriptionParams {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    /// Non-numeric limits are ignored rather than rejected.
    fn recipes_limit(&self) -> Option<i64> {
        self.recipes_limit.as_deref()?.parse().ok()
    }
}

/// An author as seen from their subscriber's list.
#[derive(Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    user: UserView,
    recipes: Vec<RecipeSummary>,
    recipes_count: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(register))
        .route("/api/users/me", get(me))
        .route("/api/users/set_password", post(set_password))
        .route("/api/users/subscriptions", get(subscriptions))
        .route("/api/users/{id}", get(show_user))
        .route("/api/users/{id}/subscribe", post(subscribe).delete(unsubscribe))
}

pub(crate) async fn find_user(db: &SqlitePool, id: &str) -> Result<User, AppError> {
    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::UserNotFound(id.to_string()))
}

pub(crate) async fn user_view(
    db: &SqlitePool,
    user: User,
    viewer: Option<&User>,
) -> Result<UserView, AppError> {
    let is_subscribed = match viewer {
        Some(viewer) => relations::is_following(db, &viewer.id, &user.id).await?,
        None => false,
    };
    Ok(UserView::new(user, is_subscribed))
}

async fn subscription_view(
    db: &SqlitePool,
    author: User,
    viewer: &User,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, AppError> {
    // SQLite treats a negative LIMIT as "no limit".
    let recipes: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = ? ORDER BY pub_date DESC, rowid DESC LIMIT ?",
    )
    .bind(&author.id)
    .bind(recipes_limit.unwrap_or(-1))
    .fetch_all(db)
    .await?;

    let (recipes_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = ?")
        .bind(&author.id)
        .fetch_one(db)
        .await?;

    Ok(SubscriptionView {
        user: user_view(db, author, Some(viewer)).await?,
        recipes: recipes.into_iter().map(RecipeSummary::from).collect(),
        recipes_count,
    })
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_username(&payload.username)?;

    let user = User::new(
        payload.email.trim().to_lowercase(),
        payload.username,
        payload.first_name,
        payload.last_name,
    );
    let password_hash = hash_password(&payload.password)?;

    sqlx::query(
        r#"
        INSERT INTO users (id, email, username, first_name, last_name, password_hash, is_admin, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&password_hash)
    .bind(user.is_admin)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(&state.db)
    .await
    .map_err(|e| {
        on_unique_violation(
            e,
            AppError::Conflict("A user with that email or username already exists".to_string()),
        )
    })?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserView::new(user, false))))
}

async fn list_users(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(params): Query<PageParams>,
    uri: Uri,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY username ASC LIMIT ? OFFSET ?")
        .bind(i64::from(params.limit()))
        .bind(params.offset())
        .fetch_all(&state.db)
        .await?;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;

    let mut views = Vec::with_capacity(users.len());
    for user in users {
        views.push(user_view(&state.db, user, viewer.as_ref()).await?);
    }

    Ok(Json(Page::new(views, count, params, uri.path(), uri.query())))
}

async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(UserView::new(user, false))
}

async fn show_user(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_user(&state.db, &id).await?;
    Ok(Json(user_view(&state.db, user, viewer.as_ref()).await?))
}

async fn set_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<SetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (hash,): (String,) = sqlx::query_as("SELECT password_hash FROM users WHERE id = ?")
        .bind(&user.id)
        .fetch_one(&state.db)
        .await?;
    if !verify_password(&payload.current_password, &hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(hash_password(&payload.new_password)?)
        .bind(&now)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn subscriptions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<SubscriptionParams>,
    uri: Uri,
) -> Result<impl IntoResponse, AppError> {
    let page_params = params.page_params();

    let authors: Vec<User> = sqlx::query_as(
        r#"
        SELECT u.* FROM users u
        JOIN follows f ON f.author_id = u.id
        WHERE f.user_id = ?
        ORDER BY u.username ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&user.id)
    .bind(i64::from(page_params.limit()))
    .bind(page_params.offset())
    .fetch_all(&state.db)
    .await?;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = ?")
        .bind(&user.id)
        .fetch_one(&state.db)
        .await?;

    let mut views = Vec::with_capacity(authors.len());
    for author in authors {
        views.push(subscription_view(&state.db, author, &user, params.recipes_limit()).await?);
    }

    Ok(Json(Page::new(views, count, page_params, uri.path(), uri.query())))
}

async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Query(params): Query<SubscriptionParams>,
) -> Result<impl IntoResponse, AppError> {
    let author = find_user(&state.db, &id).await?;
    relations::follow(&state.db, &user.id, &author.id).await?;

    let view = subscription_view(&state.db, author, &user, params.recipes_limit()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let author = find_user(&state.db, &id).await?;
    relations::unfollow(&state.db, &user.id, &author.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
