//! Consumption variance analyzer
//!
//! Compares theoretical ingredient usage (recipe lines x units sold) with
//! actual usage over a period and ranks the gaps for operator triage.
//! Actual usage is derived from goods receipts converted to usage units:
//! purchases stand in for physical consumption.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use shared::models::{IngredientGap, VarianceReport};
use shared::types::{DateRange, IngredientId};
use shared::validation::validate_date_range;

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::repository::Repository;

/// Variance analyzer service
#[derive(Clone)]
pub struct VarianceAnalyzer<R: Repository> {
    repo: R,
    alert_threshold_percent: Decimal,
    sensitive_categories: Vec<String>,
    high_value_ingredients: Vec<String>,
}

impl<R: Repository> VarianceAnalyzer<R> {
    /// Create a new VarianceAnalyzer instance
    pub fn new(repo: R, config: &Config) -> Self {
        Self {
            repo,
            alert_threshold_percent: config.variance.alert_threshold_percent,
            sensitive_categories: config
                .variance
                .sensitive_categories
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            high_value_ingredients: config
                .variance
                .high_value_ingredients
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
        }
    }

    /// Compute the consumption gap report for a period
    ///
    /// The output is fully determined by the records in the period; a
    /// closed period yields the same report on every run.
    pub async fn compute_gap(&self, period: DateRange) -> EngineResult<VarianceReport> {
        validate_date_range(&period)
            .map_err(|message| EngineError::validation("period", message))?;

        // Theoretical: recipe composition times units sold.
        let mut theoretical: BTreeMap<IngredientId, Decimal> = BTreeMap::new();
        for sale in self.repo.sales_in_range(period).await? {
            let lines = self.repo.recipe_lines_for_recipe(sale.recipe_id).await?;
            if lines.is_empty() {
                tracing::debug!(
                    "Sale {} references recipe {} without recipe lines; skipping",
                    sale.id,
                    sale.recipe_id
                );
                continue;
            }
            for line in &lines {
                *theoretical.entry(line.ingredient_id).or_default() +=
                    sale.quantity_sold * line.quantity;
            }
        }

        // Actual: receipts in the period, converted to usage units.
        let mut actual: BTreeMap<IngredientId, Decimal> = BTreeMap::new();
        for line in self.repo.receipt_lines_in_range(period).await? {
            let factor = match self.repo.ingredient(line.ingredient_id).await? {
                Some(ingredient) => ingredient.conversion_factor,
                None => {
                    tracing::warn!(
                        "Receipt line for ingredient {} missing from master data; assuming conversion factor 1",
                        line.ingredient_id
                    );
                    Decimal::ONE
                }
            };
            *actual.entry(line.ingredient_id).or_default() += line.quantity * factor;
        }

        let ids: BTreeSet<IngredientId> = theoretical.keys().chain(actual.keys()).copied().collect();

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let theoretical_qty = theoretical.get(&id).copied().unwrap_or_default();
            let actual_qty = actual.get(&id).copied().unwrap_or_default();
            let gap = actual_qty - theoretical_qty;

            let (ingredient_name, category_name) = self.ingredient_labels(id).await?;
            let critical = self.is_critical(&ingredient_name, category_name.as_deref());
            let gap_pct = gap_percentage(gap, theoretical_qty);

            entries.push(IngredientGap {
                ingredient_id: id,
                ingredient_name,
                category_name,
                theoretical: theoretical_qty,
                actual: actual_qty,
                gap,
                gap_percentage: gap_pct,
                critical,
                alert: gap_pct > self.alert_threshold_percent,
            });
        }

        // Strongest loss signals first; the tie-breakers keep the order
        // total so that repeated runs compare equal.
        entries.sort_by(|a, b| {
            b.gap_percentage
                .cmp(&a.gap_percentage)
                .then_with(|| b.gap.abs().cmp(&a.gap.abs()))
                .then_with(|| a.ingredient_name.cmp(&b.ingredient_name))
        });

        Ok(VarianceReport { period, entries })
    }

    async fn ingredient_labels(
        &self,
        id: IngredientId,
    ) -> EngineResult<(String, Option<String>)> {
        let Some(ingredient) = self.repo.ingredient(id).await? else {
            tracing::warn!("Ingredient {} missing from master data; reporting by raw id", id);
            return Ok((id.to_string(), None));
        };
        let category_name = match ingredient.category_id {
            Some(category_id) => self.repo.category(category_id).await?.map(|c| c.name),
            None => None,
        };
        Ok((ingredient.name, category_name))
    }

    fn is_critical(&self, ingredient_name: &str, category_name: Option<&str>) -> bool {
        let name = ingredient_name.to_lowercase();
        if self.high_value_ingredients.contains(&name) {
            return true;
        }
        category_name
            .map(|category| self.sensitive_categories.contains(&category.to_lowercase()))
            .unwrap_or(false)
    }
}

/// Gap as a percentage of theoretical consumption; zero when there is no
/// theoretical base to compare against.
fn gap_percentage(gap: Decimal, theoretical: Decimal) -> Decimal {
    if theoretical.is_zero() {
        Decimal::ZERO
    } else {
        gap / theoretical * Decimal::ONE_HUNDRED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_gap_percentage() {
        assert_eq!(gap_percentage(dec("15"), dec("50")), dec("30"));
        assert_eq!(gap_percentage(dec("-10"), dec("40")), dec("-25"));
    }

    #[test]
    fn test_gap_percentage_with_zero_theoretical() {
        // No theoretical base: report zero percent, not a division error.
        assert_eq!(gap_percentage(dec("65"), Decimal::ZERO), Decimal::ZERO);
    }
}
