//! Larder Valuation & Reconciliation Engine
//!
//! Core cost-accounting services for the Larder platform: the
//! weighted-average valuation ledger, the recipe cost cascade, the
//! three-way invoice match and the consumption variance analyzer, wired
//! together over a pluggable repository.

pub mod config;
pub mod error;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use repository::{InMemoryRepository, PgRepository, Repository};
pub use services::cascade::CascadeOutcome;
pub use services::valuation::{MovementOutcome, RecordMovementInput};
pub use services::{CostCascade, ReconciliationMatcher, ValuationLedger, VarianceAnalyzer};

use rust_decimal::Decimal;

use shared::models::{MatchReport, VarianceReport};
use shared::types::{DateRange, IngredientId, InvoiceId, RecipeId};

/// One engine instance over one repository and one configuration
///
/// The four operations exposed here are the whole caller surface: UI
/// actions and batch jobs go through them and exchange plain records.
#[derive(Clone)]
pub struct Engine<R: Repository> {
    ledger: ValuationLedger<R>,
    cascade: CostCascade<R>,
    matcher: ReconciliationMatcher<R>,
    variance: VarianceAnalyzer<R>,
}

impl<R: Repository> Engine<R> {
    /// Create a new Engine instance
    pub fn new(repo: R, config: &Config) -> Self {
        let ledger = ValuationLedger::new(repo.clone(), config);
        let cascade = CostCascade::new(repo.clone(), config);
        let matcher = ReconciliationMatcher::new(repo.clone(), ledger.clone(), config);
        let variance = VarianceAnalyzer::new(repo, config);
        Self {
            ledger,
            cascade,
            matcher,
            variance,
        }
    }

    /// Apply a stock movement to the valuation ledger
    pub async fn apply_movement(
        &self,
        input: RecordMovementInput,
    ) -> EngineResult<MovementOutcome> {
        self.ledger.apply_movement(input).await
    }

    /// Recompute the cost of every recipe that uses an ingredient
    pub async fn recompute(&self, ingredient_id: IngredientId) -> EngineResult<CascadeOutcome> {
        self.cascade.recompute(ingredient_id).await
    }

    /// Recompute one recipe's cost snapshot (finishes deferred cascade work)
    pub async fn recompute_recipe(&self, recipe_id: RecipeId) -> EngineResult<Decimal> {
        self.cascade.recompute_recipe(recipe_id).await
    }

    /// Run the three-way match for an invoice
    pub async fn match_invoice(&self, invoice_id: InvoiceId) -> EngineResult<MatchReport> {
        self.matcher.match_invoice(invoice_id).await
    }

    /// Compute the consumption gap report for a period
    pub async fn compute_gap(&self, period: DateRange) -> EngineResult<VarianceReport> {
        self.variance.compute_gap(period).await
    }
}
