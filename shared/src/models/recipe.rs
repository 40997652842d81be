//! Recipe / technical sheet models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{IngredientId, RecipeId};

/// A dish or prepared recipe with its derived cost snapshot
///
/// `theoretical_cost` and `cost_updated_at` are owned by the cost cascade
/// and overwritten on every recomputation; everything else is master data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub sale_price: Option<Decimal>,
    /// Sum of line quantity x current weighted-average cost over all lines.
    pub theoretical_cost: Decimal,
    pub cost_updated_at: Option<DateTime<Utc>>,
}

/// One ingredient requirement of a recipe, in usage units
///
/// Recipes do not reference other recipes, so cost recomputation never
/// needs a transitive closure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeLine {
    pub id: Uuid,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub quantity: Decimal,
}
