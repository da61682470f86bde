use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::Ingredient;
use crate::AppState;

#[derive(Deserialize)]
pub struct IngredientFilter {
    name: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ingredients", get(list_ingredients))
        .route("/api/ingredients/{id}", get(show_ingredient))
}

/// Case-insensitive prefix match. SQLite's `LIKE` only folds ASCII, so
/// matching happens here to cover Cyrillic and other non-ASCII names.
fn has_prefix(name: &str, lowered_prefix: &str) -> bool {
    name.to_lowercase().starts_with(lowered_prefix)
}

async fn list_ingredients(
    State(state): State<AppState>,
    Query(filter): Query<IngredientFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut ingredients: Vec<Ingredient> =
        sqlx::query_as("SELECT * FROM ingredients ORDER BY name ASC, measurement_unit ASC")
            .fetch_all(&state.db)
            .await?;

    if let Some(prefix) = filter.name.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        let prefix = prefix.to_lowercase();
        ingredients.retain(|ingredient| has_prefix(&ingredient.name, &prefix));
    }
    Ok(Json(ingredients))
}

async fn show_ingredient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    ingredient.map(Json).ok_or(AppError::NotFound)
}
