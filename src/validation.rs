use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

use crate::error::AppError;

pub const MIN_COOKING_TIME: i64 = 1;
pub const MAX_INGREDIENT_AMOUNT: i64 = i32::MAX as i64;
pub const MAX_RECIPE_NAME_LENGTH: usize = 200;
pub const MAX_USERNAME_LENGTH: usize = 150;

static USERNAME_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w.@+-]").expect("valid username regex"));

/// Reasons a recipe submission is rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecipeError {
    #[error("At least one ingredient must be specified")]
    MissingIngredients,
    #[error("Ingredient with ID {0} does not exist")]
    UnknownIngredient(String),
    #[error("Ingredient with ID {0} already exists in the recipe")]
    DuplicateIngredient(String),
    #[error("Ingredient with ID {0} must have a quantity greater than zero")]
    NonPositiveAmount(String),
    #[error("Ingredient with ID {0} must have a quantity of at most {max}", max = MAX_INGREDIENT_AMOUNT)]
    AmountTooLarge(String),
    #[error("At least one tag must be selected")]
    MissingTags,
    #[error("Tags must be unique")]
    DuplicateTags,
    #[error("Tag with ID {0} does not exist")]
    UnknownTag(String),
    #[error("Cooking time cannot be less than {} minute", MIN_COOKING_TIME)]
    InvalidCookingTime,
    #[error("{0}")]
    InvalidField(String),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

impl RecipeError {
    pub fn kind(&self) -> &'static str {
        match self {
            RecipeError::MissingIngredients => "MissingIngredients",
            RecipeError::UnknownIngredient(_) => "UnknownIngredient",
            RecipeError::DuplicateIngredient(_) => "DuplicateIngredient",
            RecipeError::NonPositiveAmount(_) => "NonPositiveAmount",
            RecipeError::AmountTooLarge(_) => "AmountTooLarge",
            RecipeError::MissingTags => "MissingTags",
            RecipeError::DuplicateTags => "DuplicateTags",
            RecipeError::UnknownTag(_) => "UnknownTag",
            RecipeError::InvalidCookingTime => "InvalidCookingTime",
            RecipeError::InvalidField(_) => "InvalidField",
            RecipeError::InvalidImage(_) => "InvalidImage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngredientInput {
    pub id: String,
    pub amount: i64,
}

/// Ingredient and tag sets that passed validation, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRelations {
    pub ingredients: Vec<IngredientInput>,
    pub tags: Vec<String>,
}

/// Checks a submitted ingredient list and tag list against the catalogs.
///
/// Each ingredient is checked for existence, then repetition, then amount,
/// so the first offending item decides the error. Tags are checked after
/// all ingredients pass.
pub fn validate_relations(
    ingredients: Vec<IngredientInput>,
    tags: Vec<String>,
    known_ingredients: &HashSet<String>,
    known_tags: &HashSet<String>,
) -> Result<RecipeRelations, RecipeError> {
    if ingredients.is_empty() {
        return Err(RecipeError::MissingIngredients);
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    for item in &ingredients {
        if !known_ingredients.contains(&item.id) {
            return Err(RecipeError::UnknownIngredient(item.id.clone()));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(RecipeError::DuplicateIngredient(item.id.clone()));
        }
        if item.amount <= 0 {
            return Err(RecipeError::NonPositiveAmount(item.id.clone()));
        }
        if item.amount > MAX_INGREDIENT_AMOUNT {
            return Err(RecipeError::AmountTooLarge(item.id.clone()));
        }
    }

    if tags.is_empty() {
        return Err(RecipeError::MissingTags);
    }
    let unique: HashSet<&str> = tags.iter().map(String::as_str).collect();
    if unique.len() != tags.len() {
        return Err(RecipeError::DuplicateTags);
    }
    if let Some(unknown) = tags.iter().find(|id| !known_tags.contains(*id)) {
        return Err(RecipeError::UnknownTag(unknown.clone()));
    }

    Ok(RecipeRelations { ingredients, tags })
}

pub fn validate_name(name: &str) -> Result<(), RecipeError> {
    if name.trim().is_empty() {
        return Err(RecipeError::InvalidField("Name is required".to_string()));
    }
    if name.chars().count() > MAX_RECIPE_NAME_LENGTH {
        return Err(RecipeError::InvalidField(format!(
            "Name must be at most {MAX_RECIPE_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_text(text: &str) -> Result<(), RecipeError> {
    if text.trim().is_empty() {
        return Err(RecipeError::InvalidField("Text is required".to_string()));
    }
    Ok(())
}

pub fn validate_cooking_time(cooking_time: i64) -> Result<(), RecipeError> {
    if cooking_time < MIN_COOKING_TIME {
        return Err(RecipeError::InvalidCookingTime);
    }
    Ok(())
}

/// Usernames are letters, digits and `@ . + - _`, and never "me".
pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AppError::InvalidField(format!(
            "Username must be between 1 and {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if username.to_lowercase() == "me" {
        return Err(AppError::InvalidField("Username cannot be \"me\"".to_string()));
    }
    let invalid: String = USERNAME_DISALLOWED
        .find_iter(username)
        .map(|m| m.as_str())
        .collect();
    if !invalid.is_empty() {
        return Err(AppError::InvalidField(format!(
            "Invalid characters found in the username: {invalid}"
        )));
    }
    Ok(())
}
