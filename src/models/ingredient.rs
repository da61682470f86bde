use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
}

impl Ingredient {
    pub fn new(name: String, measurement_unit: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            measurement_unit: measurement_unit.trim().to_string(),
        }
    }
}

/// An ingredient as it appears inside a recipe, with the recipe's amount.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IngredientAmountView {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}
