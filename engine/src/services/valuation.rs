//! Weighted-average valuation ledger
//!
//! Applies stock movements to the running per-ingredient valuation and
//! triggers the recipe cost cascade for the affected ingredient. Movements
//! for one ingredient are serialized; callers must apply each logical
//! movement exactly once (no deduplication is performed here).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::models::{MovementKind, StockMovement, StockValuation};
use shared::types::{IngredientId, MovementId};
use shared::validation::validate_movement;

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::repository::Repository;
use crate::services::cascade::{CascadeOutcome, CostCascade};

/// Input for applying one stock movement
#[derive(Debug, Clone, Deserialize)]
pub struct RecordMovementInput {
    pub ingredient_id: IngredientId,
    /// Signed quantity in stock units: positive inbound, negative outbound.
    pub delta_quantity: Decimal,
    /// Total monetary value of an inbound movement; ignored for outbound.
    pub total_amount: Decimal,
    pub kind: MovementKind,
    /// Source document (receipt, invoice, sale) when one exists.
    pub reference_id: Option<Uuid>,
}

/// Result of one applied movement
#[derive(Debug, Clone, Serialize)]
pub struct MovementOutcome {
    pub movement: StockMovement,
    pub valuation: StockValuation,
    pub cascade: CascadeOutcome,
}

/// Valuation ledger service
#[derive(Clone)]
pub struct ValuationLedger<R: Repository> {
    repo: R,
    cascade: CostCascade<R>,
    /// One mutex per ingredient, shared across clones of the ledger.
    locks: Arc<Mutex<HashMap<IngredientId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<R: Repository> ValuationLedger<R> {
    /// Create a new ValuationLedger instance
    pub fn new(repo: R, config: &Config) -> Self {
        Self {
            cascade: CostCascade::new(repo.clone(), config),
            repo,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Apply one stock movement and recompute dependent recipe costs
    pub async fn apply_movement(
        &self,
        input: RecordMovementInput,
    ) -> EngineResult<MovementOutcome> {
        validate_movement(input.delta_quantity, input.total_amount)
            .map_err(|message| EngineError::validation("delta_quantity", message))?;

        // Outbound movements never carry value out of the average.
        let amount = if input.delta_quantity < Decimal::ZERO {
            Decimal::ZERO
        } else {
            input.total_amount
        };

        let lock = self.ingredient_lock(input.ingredient_id);
        let guard = lock.lock_owned().await;

        if self.repo.ingredient(input.ingredient_id).await?.is_none() {
            tracing::warn!(
                "Movement for ingredient {} missing from master data; recording against the raw id",
                input.ingredient_id
            );
        }

        let previous = self.repo.valuation(input.ingredient_id).await?;
        let current = previous
            .clone()
            .unwrap_or_else(|| StockValuation::empty(input.ingredient_id));

        let (new_quantity, raw_cost) = next_valuation(
            current.quantity_on_hand,
            current.weighted_average_cost,
            input.delta_quantity,
            amount,
        );
        let new_cost = if raw_cost < Decimal::ZERO {
            tracing::warn!(
                "Clamping negative weighted-average cost {} for ingredient {} to zero",
                raw_cost,
                input.ingredient_id
            );
            Decimal::ZERO
        } else {
            raw_cost
        };

        let now = Utc::now();
        let valuation = StockValuation {
            ingredient_id: input.ingredient_id,
            quantity_on_hand: new_quantity,
            weighted_average_cost: new_cost,
            updated_at: now,
        };
        let movement = StockMovement {
            id: MovementId::new(),
            ingredient_id: input.ingredient_id,
            delta_quantity: input.delta_quantity,
            kind: input.kind,
            amount,
            reference_id: input.reference_id,
            occurred_at: now,
        };

        self.repo.upsert_valuation(&valuation).await?;
        if let Err(err) = self.repo.append_movement(&movement).await {
            // The valuation is already written; roll it back so the
            // ledger and the movement journal stay consistent.
            let rollback =
                previous.unwrap_or_else(|| StockValuation::empty(input.ingredient_id));
            if let Err(restore_err) = self.repo.upsert_valuation(&rollback).await {
                tracing::error!(
                    "Failed to restore valuation for ingredient {} after append error: {}",
                    input.ingredient_id,
                    restore_err
                );
                return Err(EngineError::StorageError(format!(
                    "valuation for ingredient {} left inconsistent: append failed ({}), restore failed ({})",
                    input.ingredient_id, err, restore_err
                )));
            }
            return Err(err);
        }

        // The cascade only reads valuations and is recomputable; it runs
        // outside the per-ingredient critical section.
        drop(guard);

        let cascade = match self.cascade.recompute(input.ingredient_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    "Cost cascade for ingredient {} failed after movement {}: {}",
                    input.ingredient_id,
                    movement.id,
                    err
                );
                CascadeOutcome::default()
            }
        };

        Ok(MovementOutcome {
            movement,
            valuation,
            cascade,
        })
    }

    fn ingredient_lock(&self, ingredient_id: IngredientId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(ingredient_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Next (quantity, cost) pair after a movement, before the non-negative
/// clamp.
///
/// Inbound movements blend their value into the weighted average; outbound
/// movements change quantity only. A movement that leaves stock at or
/// below zero resets the cost to the movement's own unit value, discarding
/// the prior average. A zero-delta movement with a non-zero amount
/// revalues the stock on hand (invoice price corrections).
fn next_valuation(
    old_quantity: Decimal,
    old_cost: Decimal,
    delta_quantity: Decimal,
    amount: Decimal,
) -> (Decimal, Decimal) {
    let new_quantity = old_quantity + delta_quantity;

    let new_cost = if new_quantity <= Decimal::ZERO {
        if delta_quantity.is_zero() {
            // No stock to average over; leave the basis untouched.
            old_cost
        } else {
            amount / delta_quantity
        }
    } else if delta_quantity > Decimal::ZERO || (delta_quantity.is_zero() && !amount.is_zero()) {
        (old_quantity * old_cost + amount) / new_quantity
    } else {
        old_cost
    };

    (new_quantity, new_cost)
}
