//! Favorites, shopping cart and follow relations.
//!
//! Duplicate detection relies on the tables' unique constraints, so two
//! racing inserts of the same pair cannot both succeed.

use sqlx::SqlitePool;

use crate::error::{on_unique_violation, AppError};
use crate::models::{Follow, ListEntry, Recipe, RecipeList, RecipeSummary};

async fn find_recipe(db: &SqlitePool, recipe_id: &str) -> Result<Recipe, AppError> {
    sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::RecipeNotFound(recipe_id.to_string()))
}

pub async fn add_to_list(
    db: &SqlitePool,
    list: RecipeList,
    user_id: &str,
    recipe_id: &str,
) -> Result<RecipeSummary, AppError> {
    let recipe = find_recipe(db, recipe_id).await?;
    let entry = ListEntry::new(user_id.to_string(), recipe.id.clone());

    sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id, created_at) VALUES (?, ?, ?)",
        list.table()
    ))
    .bind(&entry.user_id)
    .bind(&entry.recipe_id)
    .bind(&entry.created_at)
    .execute(db)
    .await
    .map_err(|e| on_unique_violation(e, AppError::AlreadyInList(list)))?;

    tracing::info!(user_id, recipe_id, list = %list, "recipe added to list");
    Ok(recipe.into())
}

pub async fn remove_from_list(
    db: &SqlitePool,
    list: RecipeList,
    user_id: &str,
    recipe_id: &str,
) -> Result<(), AppError> {
    find_recipe(db, recipe_id).await?;

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotInList(list));
    }
    Ok(())
}

pub async fn is_in_list(
    db: &SqlitePool,
    list: RecipeList,
    user_id: &str,
    recipe_id: &str,
) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = ? AND recipe_id = ?",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

/// Subscribes `user_id` to `author_id`. The author must already exist.
pub async fn follow(db: &SqlitePool, user_id: &str, author_id: &str) -> Result<(), AppError> {
    if user_id == author_id {
        return Err(AppError::SelfFollow);
    }

    let follow = Follow::new(user_id.to_string(), author_id.to_string());
    sqlx::query("INSERT INTO follows (user_id, author_id, created_at) VALUES (?, ?, ?)")
        .bind(&follow.user_id)
        .bind(&follow.author_id)
        .bind(&follow.created_at)
        .execute(db)
        .await
        .map_err(|e| on_unique_violation(e, AppError::AlreadyFollowing))?;

    tracing::info!(user_id, author_id, "user followed author");
    Ok(())
}

pub async fn unfollow(db: &SqlitePool, user_id: &str, author_id: &str) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
        .bind(user_id)
        .bind(author_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFollowing);
    }
    Ok(())
}

pub async fn is_following(db: &SqlitePool, user_id: &str, author_id: &str) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .fetch_one(db)
            .await?;
    Ok(count > 0)
}
