//! Recipe cost cascade
//!
//! Recomputes the theoretical cost snapshot of every recipe that uses an
//! ingredient whose valuation changed. Recipes never reference other
//! recipes, so one level of recomputation is always enough.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Serialize;

use shared::types::{IngredientId, RecipeId};

use crate::config::Config;
use crate::error::EngineResult;
use crate::repository::Repository;

/// Result of one cascade invocation
#[derive(Debug, Clone, Default, Serialize)]
pub struct CascadeOutcome {
    /// Recipes recomputed in this invocation, with their new cost.
    pub recomputed: Vec<(RecipeId, Decimal)>,
    /// Recipes whose recomputation failed; the others still proceeded.
    pub failed: Vec<(RecipeId, String)>,
    /// Recipes beyond the fan-out bound, left for a batch run.
    pub deferred: Vec<RecipeId>,
}

/// Cost cascade service
#[derive(Clone)]
pub struct CostCascade<R: Repository> {
    repo: R,
    max_fanout: usize,
}

impl<R: Repository> CostCascade<R> {
    /// Create a new CostCascade instance
    pub fn new(repo: R, config: &Config) -> Self {
        Self {
            repo,
            max_fanout: config.cascade.max_fanout,
        }
    }

    /// Recompute every recipe that uses `ingredient_id`, up to the
    /// fan-out bound; the remainder is reported as deferred.
    pub async fn recompute(&self, ingredient_id: IngredientId) -> EngineResult<CascadeOutcome> {
        let lines = self.repo.recipe_lines_for_ingredient(ingredient_id).await?;

        // Distinct parent recipes, in a stable order.
        let parents: BTreeSet<RecipeId> = lines.iter().map(|line| line.recipe_id).collect();

        let mut outcome = CascadeOutcome::default();
        for (index, recipe_id) in parents.into_iter().enumerate() {
            if index >= self.max_fanout {
                outcome.deferred.push(recipe_id);
                continue;
            }
            match self.recompute_recipe(recipe_id).await {
                Ok(cost) => outcome.recomputed.push((recipe_id, cost)),
                Err(e) => {
                    // Log error but continue with the sibling recipes
                    tracing::error!("Failed to recompute cost of recipe {}: {}", recipe_id, e);
                    outcome.failed.push((recipe_id, e.to_string()));
                }
            }
        }

        if !outcome.deferred.is_empty() {
            tracing::warn!(
                "Cascade for ingredient {} hit the fan-out bound; {} recipes deferred",
                ingredient_id,
                outcome.deferred.len()
            );
        }

        Ok(outcome)
    }

    /// Recompute one recipe over all of its lines and persist the snapshot
    pub async fn recompute_recipe(&self, recipe_id: RecipeId) -> EngineResult<Decimal> {
        let lines = self.repo.recipe_lines_for_recipe(recipe_id).await?;

        let mut cost = Decimal::ZERO;
        for line in &lines {
            let unit_cost = match self.repo.valuation(line.ingredient_id).await? {
                Some(valuation) => valuation.weighted_average_cost,
                // Not received yet: the line is costed at zero until a
                // valuation exists.
                None => Decimal::ZERO,
            };
            cost += line.quantity * unit_cost;
        }

        self.repo.update_recipe_cost(recipe_id, cost).await?;
        Ok(cost)
    }
}
