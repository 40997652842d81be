//! Three-way match result models
//!
//! A match report is derived data: it is returned to the caller and only
//! the resulting invoice status is persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::procurement::InvoiceStatus;
use crate::types::{IngredientId, InvoiceId};

/// Outcome of matching one invoice line against the linked receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineMatchFlag {
    /// Invoiced quantity is covered by the received quantity.
    QuantityMatched,
    /// Item invoiced but never received.
    UnmatchedLine,
    /// Invoiced quantity exceeds the received quantity.
    QuantityExceedsReceipt,
}

impl LineMatchFlag {
    /// Critical flags block payment of the whole invoice.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            LineMatchFlag::UnmatchedLine | LineMatchFlag::QuantityExceedsReceipt
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineMatchFlag::QuantityMatched => "quantity_matched",
            LineMatchFlag::UnmatchedLine => "unmatched_line",
            LineMatchFlag::QuantityExceedsReceipt => "quantity_exceeds_receipt",
        }
    }
}

/// Per-line match detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineMatch {
    pub ingredient_id: IngredientId,
    pub invoiced_quantity: Decimal,
    pub invoiced_unit_price: Decimal,
    /// Quantity on the matching receipt line, when one exists.
    pub received_quantity: Option<Decimal>,
    /// Receipt-time unit price of the matching line, when one exists.
    pub receipt_unit_price: Option<Decimal>,
    pub flag: LineMatchFlag,
}

/// A ledger cost correction applied after a successful match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostCorrection {
    pub ingredient_id: IngredientId,
    /// Signed value difference between invoiced and receipt-booked cost.
    pub amount: Decimal,
}

/// A correction that could not be applied; the rest of the match stands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionFailure {
    pub ingredient_id: IngredientId,
    pub reason: String,
}

/// Aggregate result of the three-way match for one invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub invoice_id: InvoiceId,
    pub status: InvoiceStatus,
    pub lines: Vec<LineMatch>,
    /// Sum of invoiced quantity x invoiced unit price over all lines.
    pub invoiced_total: Decimal,
    /// Sum of invoiced quantity x agreed (order, else receipt) unit price.
    pub expected_total: Decimal,
    /// Price variance beyond tolerance; surfaced for manual approval but
    /// never blocking on its own.
    pub requires_approval: bool,
    /// Cost corrections fed to the valuation ledger (empty when blocked).
    pub corrections: Vec<CostCorrection>,
    pub correction_failures: Vec<CorrectionFailure>,
}

impl MatchReport {
    pub fn is_blocked(&self) -> bool {
        self.status == InvoiceStatus::Blocked
    }

    /// Absolute difference between invoiced and expected totals.
    pub fn price_variance(&self) -> Decimal {
        (self.invoiced_total - self.expected_total).abs()
    }
}
