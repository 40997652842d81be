//! Consumption variance ("shrinkage") report models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DateRange, IngredientId};

/// Theoretical-versus-actual consumption for one ingredient over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientGap {
    pub ingredient_id: IngredientId,
    pub ingredient_name: String,
    pub category_name: Option<String>,
    /// Usage implied by recipes x units sold, in usage units.
    pub theoretical: Decimal,
    /// Receipts in the period converted to usage units (purchases stand in
    /// for physical consumption).
    pub actual: Decimal,
    /// actual - theoretical; positive means more bought than recipes
    /// predict.
    pub gap: Decimal,
    /// gap / theoretical x 100; zero when theoretical is zero.
    pub gap_percentage: Decimal,
    /// Category or item is on the configured sensitive/high-value lists.
    pub critical: bool,
    /// Gap percentage above the configured alert threshold.
    pub alert: bool,
}

/// Ranked variance report for operator triage
///
/// Entries are sorted by gap percentage descending, so the strongest loss
/// signals come first. The report carries no generation timestamp: two
/// runs over the same closed period compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceReport {
    pub period: DateRange,
    pub entries: Vec<IngredientGap>,
}

impl VarianceReport {
    /// Entries whose gap percentage crossed the alert threshold.
    pub fn alerts(&self) -> impl Iterator<Item = &IngredientGap> {
        self.entries.iter().filter(|e| e.alert)
    }
}
