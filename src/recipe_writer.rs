use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Recipe;
use crate::validation::{validate_relations, IngredientInput, RecipeRelations};

pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub image: String,
}

/// Scalar fields to overwrite on update; `None` keeps the stored value.
#[derive(Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
}

async fn existing_ids(
    db: &SqlitePool,
    table: &'static str,
    ids: &[String],
) -> Result<HashSet<String>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {table} WHERE id IN ("));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");

    let rows: Vec<(String,)> = query.build_query_as::<(String,)>().fetch_all(db).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Looks up the submitted ids in the catalogs and runs the relation checks.
pub async fn check_relations(
    db: &SqlitePool,
    ingredients: Vec<IngredientInput>,
    tags: Vec<String>,
) -> Result<RecipeRelations, AppError> {
    let ingredient_ids: Vec<String> = ingredients.iter().map(|i| i.id.clone()).collect();
    let known_ingredients = existing_ids(db, "ingredients", &ingredient_ids).await?;
    let known_tags = existing_ids(db, "tags", &tags).await?;

    Ok(validate_relations(ingredients, tags, &known_ingredients, &known_tags)?)
}

async fn write_relations(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    relations: &RecipeRelations,
) -> Result<(), sqlx::Error> {
    let mut tags = QueryBuilder::<Sqlite>::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    tags.push_values(&relations.tags, |mut row, tag_id| {
        row.push_bind(recipe_id.to_string()).push_bind(tag_id.clone());
    });
    tags.build().execute(&mut *conn).await?;

    let mut amounts = QueryBuilder::<Sqlite>::new(
        "INSERT INTO ingredient_amounts (recipe_id, ingredient_id, amount) ",
    );
    amounts.push_values(&relations.ingredients, |mut row, item| {
        row.push_bind(recipe_id.to_string())
            .push_bind(item.id.clone())
            .push_bind(item.amount);
    });
    amounts.build().execute(&mut *conn).await?;

    Ok(())
}

async fn clear_relations(conn: &mut SqliteConnection, recipe_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM ingredient_amounts WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Inserts the recipe, its tags and its ingredient amounts in one transaction.
pub async fn create_recipe(
    db: &SqlitePool,
    author_id: &str,
    recipe: NewRecipe,
    relations: &RecipeRelations,
) -> Result<Recipe, AppError> {
    let now = Utc::now().to_rfc3339();
    let recipe = Recipe {
        id: Uuid::new_v4().to_string(),
        author_id: author_id.to_string(),
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: now.clone(),
        updated_at: now,
    };

    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO recipes (id, author_id, name, image, text, cooking_time, pub_date, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&recipe.id)
    .bind(&recipe.author_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(&recipe.pub_date)
    .bind(&recipe.updated_at)
    .execute(&mut *tx)
    .await?;

    write_relations(&mut *tx, &recipe.id, relations).await?;

    tx.commit().await?;

    tracing::info!(recipe_id = %recipe.id, author_id, "recipe created");
    Ok(recipe)
}

/// Applies scalar changes and swaps the tag and ingredient sets wholesale.
pub async fn update_recipe(
    db: &SqlitePool,
    recipe_id: &str,
    changes: RecipeChanges,
    relations: &RecipeRelations,
) -> Result<Recipe, AppError> {
    let now = Utc::now().to_rfc3339();
    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        UPDATE recipes
        SET name = COALESCE(?, name),
            text = COALESCE(?, text),
            cooking_time = COALESCE(?, cooking_time),
            image = COALESCE(?, image),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&changes.name)
    .bind(&changes.text)
    .bind(changes.cooking_time)
    .bind(&changes.image)
    .bind(&now)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await?;

    clear_relations(&mut *tx, recipe_id).await?;
    write_relations(&mut *tx, recipe_id, relations).await?;

    let recipe: Recipe = sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(recipe_id, "recipe updated");
    Ok(recipe)
}

pub async fn delete_recipe(db: &SqlitePool, recipe_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .execute(db)
        .await?;

    tracing::info!(recipe_id, "recipe deleted");
    Ok(())
}
