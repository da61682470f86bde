use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::Query;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::auth::{AuthUser, MaybeUser};
use crate::error::AppError;
use crate::image::{decode_data_url, media_url, remove_image, save_recipe_image};
use crate::models::{IngredientAmountView, Recipe, RecipeList, RecipeView, Tag, User};
use crate::pagination::{Page, PageParams};
use crate::recipe_writer::{self, NewRecipe, RecipeChanges};
use crate::routes::users::{find_user, user_view};
use crate::validation::{
    validate_cooking_time, validate_name, validate_text, IngredientInput, RecipeError,
};
use crate::{relations, shopping_cart, AppState};

#[derive(Deserialize)]
pub struct CreateRecipePayload {
    #[serde(default)]
    ingredients: Vec<IngredientInput>,
    #[serde(default)]
    tags: Vec<String>,
    image: Option<String>,
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i64>,
}

/// Ingredients and tags are always replaced in full; other fields are optional.
#[derive(Deserialize)]
pub struct UpdateRecipePayload {
    #[serde(default)]
    ingredients: Vec<IngredientInput>,
    #[serde(default)]
    tags: Vec<String>,
    image: Option<String>,
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i64>,
}

#[derive(Deserialize, Default)]
pub struct RecipeFilter {
    page: Option<u32>,
    limit: Option<u32>,
    author: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    is_favorited: Option<String>,
    is_in_shopping_cart: Option<String>,
}

impl RecipeFilter {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

fn flag(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("1" | "true"))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, RecipeError> {
    value.ok_or_else(|| RecipeError::InvalidField(format!("Field '{field}' is required")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/download_shopping_cart",
            get(download_shopping_cart),
        )
        .route(
            "/api/recipes/{id}",
            get(show_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/api/recipes/{id}/favorite",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/api/recipes/{id}/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}

async fn find_recipe(db: &SqlitePool, id: &str) -> Result<Recipe, AppError> {
    sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::RecipeNotFound(id.to_string()))
}

pub(crate) async fn recipe_view(
    db: &SqlitePool,
    recipe: Recipe,
    viewer: Option<&User>,
) -> Result<RecipeView, AppError> {
    let tags: Vec<Tag> = sqlx::query_as(
        r#"
        SELECT t.* FROM tags t
        JOIN recipe_tags rt ON rt.tag_id = t.id
        WHERE rt.recipe_id = ?
        ORDER BY t.name ASC
        "#,
    )
    .bind(&recipe.id)
    .fetch_all(db)
    .await?;

    let ingredients: Vec<IngredientAmountView> = sqlx::query_as(
        r#"
        SELECT i.id, i.name, i.measurement_unit, ia.amount
        FROM ingredient_amounts ia
        JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE ia.recipe_id = ?
        ORDER BY i.name ASC
        "#,
    )
    .bind(&recipe.id)
    .fetch_all(db)
    .await?;

    let author = find_user(db, &recipe.author_id).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            relations::is_in_list(db, RecipeList::Favorites, &viewer.id, &recipe.id).await?,
            relations::is_in_list(db, RecipeList::ShoppingCart, &viewer.id, &recipe.id).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author: user_view(db, author, viewer).await?,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: media_url(&recipe.image),
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

/// Appends the WHERE clause shared by the list and count queries.
fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &RecipeFilter, viewer: Option<&User>) {
    query.push(" WHERE 1 = 1");

    if let Some(author) = &filter.author {
        query.push(" AND r.author_id = ").push_bind(author.clone());
    }

    if !filter.tags.is_empty() {
        query.push(
            " AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt \
             JOIN tags t ON t.id = rt.tag_id WHERE t.slug IN (",
        );
        let mut slugs = query.separated(", ");
        for slug in &filter.tags {
            slugs.push_bind(slug.clone());
        }
        slugs.push_unseparated("))");
    }

    let lists = [
        (flag(&filter.is_favorited), RecipeList::Favorites),
        (flag(&filter.is_in_shopping_cart), RecipeList::ShoppingCart),
    ];
    for (enabled, list) in lists {
        if !enabled {
            continue;
        }
        match viewer {
            Some(viewer) => {
                query
                    .push(format!(
                        " AND r.id IN (SELECT recipe_id FROM {} WHERE user_id = ",
                        list.table()
                    ))
                    .push_bind(viewer.id.clone())
                    .push(")");
            }
            // Anonymous visitors have no lists.
            None => {
                query.push(" AND 0");
            }
        }
    }
}

async fn list_recipes(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(filter): Query<RecipeFilter>,
    uri: Uri,
) -> Result<impl IntoResponse, AppError> {
    let params = filter.page_params();

    let mut query = QueryBuilder::<Sqlite>::new("SELECT r.* FROM recipes r");
    push_filters(&mut query, &filter, viewer.as_ref());
    query
        .push(" ORDER BY r.pub_date DESC, r.rowid DESC LIMIT ")
        .push_bind(i64::from(params.limit()))
        .push(" OFFSET ")
        .push_bind(params.offset());
    let recipes: Vec<Recipe> = query.build_query_as::<Recipe>().fetch_all(&state.db).await?;

    let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r");
    push_filters(&mut count_query, &filter, viewer.as_ref());
    let count: i64 = count_query.build_query_scalar::<i64>().fetch_one(&state.db).await?;

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(recipe_view(&state.db, recipe, viewer.as_ref()).await?);
    }

    Ok(Json(Page::new(views, count, params, uri.path(), uri.query())))
}

async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateRecipePayload>,
) -> Result<impl IntoResponse, AppError> {
    let name = required(payload.name, "name")?;
    let text = required(payload.text, "text")?;
    let cooking_time = required(payload.cooking_time, "cooking_time")?;
    validate_name(&name)?;
    validate_text(&text)?;
    validate_cooking_time(cooking_time)?;

    let relations =
        recipe_writer::check_relations(&state.db, payload.ingredients, payload.tags).await?;

    let image = decode_data_url(&required(payload.image, "image")?)?;
    let image = save_recipe_image(&state.media_root, &image).await?;

    let new_recipe = NewRecipe {
        name,
        text,
        cooking_time,
        image: image.clone(),
    };
    let recipe = match recipe_writer::create_recipe(&state.db, &user.id, new_recipe, &relations).await {
        Ok(recipe) => recipe,
        Err(e) => {
            remove_image(&state.media_root, &image).await;
            return Err(e);
        }
    };

    let view = recipe_view(&state.db, recipe, Some(&user)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn show_recipe(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = find_recipe(&state.db, &id).await?;
    Ok(Json(recipe_view(&state.db, recipe, viewer.as_ref()).await?))
}

async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRecipePayload>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_recipe(&state.db, &id).await?;
    if !user.can_modify(&existing.author_id) {
        return Err(AppError::Forbidden);
    }

    if let Some(name) = &payload.name {
        validate_name(name)?;
    }
    if let Some(text) = &payload.text {
        validate_text(text)?;
    }
    if let Some(cooking_time) = payload.cooking_time {
        validate_cooking_time(cooking_time)?;
    }

    let relations =
        recipe_writer::check_relations(&state.db, payload.ingredients, payload.tags).await?;

    let image = match payload.image.as_deref() {
        Some(data_url) => {
            let decoded = decode_data_url(data_url)?;
            Some(save_recipe_image(&state.media_root, &decoded).await?)
        }
        None => None,
    };

    let changes = RecipeChanges {
        name: payload.name,
        text: payload.text,
        cooking_time: payload.cooking_time,
        image: image.clone(),
    };
    let recipe = recipe_writer::update_recipe(&state.db, &id, changes, &relations).await;

    // Whichever image lost is removed from disk.
    let recipe = match (recipe, image) {
        (Ok(recipe), Some(_)) => {
            remove_image(&state.media_root, &existing.image).await;
            recipe
        }
        (Ok(recipe), None) => recipe,
        (Err(e), Some(new_image)) => {
            remove_image(&state.media_root, &new_image).await;
            return Err(e);
        }
        (Err(e), None) => return Err(e),
    };

    Ok(Json(recipe_view(&state.db, recipe, Some(&user)).await?))
}

async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = find_recipe(&state.db, &id).await?;
    if !user.can_modify(&recipe.author_id) {
        return Err(AppError::Forbidden);
    }

    recipe_writer::delete_recipe(&state.db, &recipe.id).await?;
    remove_image(&state.media_root, &recipe.image).await;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let summary = relations::add_to_list(&state.db, RecipeList::Favorites, &user.id, &id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    relations::remove_from_list(&state.db, RecipeList::Favorites, &user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let summary =
        relations::add_to_list(&state.db, RecipeList::ShoppingCart, &user.id, &id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    relations::remove_from_list(&state.db, RecipeList::ShoppingCart, &user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let lines = shopping_cart::cart_lines(&state.db, &user.id).await?;
    let body = shopping_cart::render(&lines)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static(shopping_cart::EXPORT_CONTENT_DISPOSITION),
    );

    Ok((headers, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_flags_accept_one_and_true() {
        assert!(flag(&Some("1".into())));
        assert!(flag(&Some("true".into())));
        assert!(!flag(&Some("0".into())));
        assert!(!flag(&None));
    }

    #[test]
    fn filters_build_expected_sql() {
        let filter = RecipeFilter {
            author: Some("a1".into()),
            tags: vec!["lunch".into(), "dinner".into()],
            is_favorited: Some("1".into()),
            ..Default::default()
        };
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r");
        push_filters(&mut query, &filter, None);

        let sql = query.sql();
        assert!(sql.contains("r.author_id = ?"));
        assert!(sql.contains("t.slug IN (?, ?))"));
        assert!(sql.ends_with(" AND 0"));
    }
}
