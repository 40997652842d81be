//! Sales event model
//!
//! Sales are written by the point-of-sale import and read by the variance
//! analyzer as the consumption log.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{RecipeId, SaleId};

/// Units of one recipe sold on one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleEvent {
    pub id: SaleId,
    pub recipe_id: RecipeId,
    pub quantity_sold: Decimal,
    pub sold_on: NaiveDate,
}
