//! Business logic services for the Larder cost engine

pub mod cascade;
pub mod reconciliation;
pub mod valuation;
pub mod variance;

pub use cascade::CostCascade;
pub use reconciliation::ReconciliationMatcher;
pub use valuation::ValuationLedger;
pub use variance::VarianceAnalyzer;
