use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User-to-recipe membership lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    pub fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }
}

impl std::fmt::Display for RecipeList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipeList::Favorites => write!(f, "favorites"),
            RecipeList::ShoppingCart => write!(f, "shopping cart"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ListEntry {
    pub user_id: String,
    pub recipe_id: String,
    pub created_at: String,
}

impl ListEntry {
    pub fn new(user_id: String, recipe_id: String) -> Self {
        Self {
            user_id,
            recipe_id,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Follow {
    pub user_id: String,
    pub author_id: String,
    pub created_at: String,
}

impl Follow {
    pub fn new(user_id: String, author_id: String) -> Self {
        Self {
            user_id,
            author_id,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
