pub mod user;
pub mod tag;
pub mod ingredient;
pub mod recipe;
pub mod relation;

pub use user::{User, UserView};
pub use tag::Tag;
pub use ingredient::{Ingredient, IngredientAmountView};
pub use recipe::{Recipe, RecipeSummary, RecipeView};
pub use relation::{Follow, ListEntry, RecipeList};
