//! Ingredient master data models
//!
//! Master data is owned by the external catalogue management; the engine
//! only reads these records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, IngredientId};

/// A stocked ingredient as seen by the costing engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub category_id: Option<CategoryId>,
    /// Multiplier from one purchase unit to usage units
    /// (e.g. a 25 kg flour sack used by the gram: 25000).
    pub conversion_factor: Decimal,
    /// Unit the supplier sells in (sack, crate, bottle, ...)
    pub purchase_unit: String,
    /// Unit recipes are written in (g, ml, piece, ...)
    pub usage_unit: String,
}

/// Ingredient grouping, used for shrinkage sensitivity classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientCategory {
    pub id: CategoryId,
    pub name: String,
}
