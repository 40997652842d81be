//! Stock valuation and movement models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{IngredientId, MovementId};

/// Running weighted-average valuation for one ingredient
///
/// Created lazily on the first movement and never deleted. Only the
/// valuation ledger mutates it. `weighted_average_cost` is never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockValuation {
    pub ingredient_id: IngredientId,
    /// Signed on-hand quantity in stock units; may go negative when
    /// consumption is recorded ahead of its receipt.
    pub quantity_on_hand: Decimal,
    /// Currency per stock unit.
    pub weighted_average_cost: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl StockValuation {
    /// Zero-quantity, zero-cost valuation used before the first movement.
    pub fn empty(ingredient_id: IngredientId) -> Self {
        Self {
            ingredient_id,
            quantity_on_hand: Decimal::ZERO,
            weighted_average_cost: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }

    /// Monetary value of the on-hand stock at the current average cost.
    pub fn stock_value(&self) -> Decimal {
        self.quantity_on_hand * self.weighted_average_cost
    }
}

/// Kinds of stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Goods received from a supplier.
    Receipt,
    /// Usage deducted by sales or production.
    Consumption,
    /// Manual or invoice-driven correction.
    Adjustment,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Receipt => "receipt",
            MovementKind::Consumption => "consumption",
            MovementKind::Adjustment => "adjustment",
        }
    }
}

/// Immutable append-only stock movement record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub ingredient_id: IngredientId,
    /// Signed quantity in stock units: positive inbound, negative outbound.
    pub delta_quantity: Decimal,
    pub kind: MovementKind,
    /// Total monetary value carried by an inbound movement; zero for
    /// outbound movements.
    pub amount: Decimal,
    /// Source document (receipt, invoice, sale) when one exists.
    pub reference_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}
