use sqlx::SqlitePool;
use std::fs;
use std::path::Path;

use crate::auth::hash_password;
use crate::models::tag::is_hex_color;
use crate::models::{Ingredient, Tag, User};
use crate::validation::validate_username;

/// Splits one CSV line into fields, honouring double-quoted fields.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Imports `name,measurement_unit` rows, skipping pairs already in the catalog.
///
/// Returns `(added, skipped)`.
pub async fn import_ingredients(
    pool: &SqlitePool,
    file_path: &Path,
) -> Result<(usize, usize), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path)?;

    let mut added = 0;
    let mut skipped = 0;
    let mut tx = pool.begin().await?;

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_line(line);
        let (Some(name), Some(unit)) = (fields.first(), fields.get(1)) else {
            return Err(format!("line {}: expected name,measurement_unit", line_no + 1).into());
        };
        if name.trim().is_empty() || unit.trim().is_empty() {
            return Err(format!("line {}: empty name or measurement unit", line_no + 1).into());
        }

        let ingredient = Ingredient::new(name.clone(), unit.clone());
        let result = sqlx::query(
            "INSERT OR IGNORE INTO ingredients (id, name, measurement_unit) VALUES (?, ?, ?)",
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            skipped += 1;
        } else {
            added += 1;
        }
    }

    tx.commit().await?;
    tracing::info!(added, skipped, "ingredients imported");
    Ok((added, skipped))
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
    pub is_admin: bool,
}

pub async fn create_user(pool: &SqlitePool, new_user: NewUser<'_>) -> Result<User, Box<dyn std::error::Error>> {
    validate_username(new_user.username)?;

    let mut user = User::new(
        new_user.email.trim().to_lowercase(),
        new_user.username.to_string(),
        new_user.first_name.to_string(),
        new_user.last_name.to_string(),
    );
    user.is_admin = new_user.is_admin;
    let password_hash = hash_password(new_user.password)?;

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
    .execute(pool)
    .await?;

    Ok(user)
}

pub async fn create_tag(
    pool: &SqlitePool,
    name: &str,
    slug: &str,
    color: Option<&str>,
) -> Result<Tag, Box<dyn std::error::Error>> {
    if let Some(color) = color {
        if !is_hex_color(color) {
            return Err(format!("color must be in HEX format (#RRGGBB), got '{color}'").into());
        }
    }

    let tag = Tag::new(name.to_string(), slug.to_string(), color.map(str::to_string));
    sqlx::query("INSERT INTO tags (id, name, color, slug) VALUES (?, ?, ?, ?)")
        .bind(&tag.id)
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&tag.slug)
        .execute(pool)
        .await?;

    Ok(tag)
}
