use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::image::media_url;
use crate::models::{IngredientAmountView, Tag, UserView};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: String,
    pub author_id: String,
    pub name: String,
    /// Path relative to the media root, e.g. `recipes/<uuid>.png`.
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
    pub pub_date: String,
    pub updated_at: String,
}

/// Short form returned by favorite/cart endpoints and subscription listings.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

impl From<Recipe> for RecipeSummary {
    fn from(recipe: Recipe) -> Self {
        Self {
            image: media_url(&recipe.image),
            id: recipe.id,
            name: recipe.name,
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: String,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<IngredientAmountView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}
