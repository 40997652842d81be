//! Three-way invoice reconciliation
//!
//! Matches a supplier invoice against its goods receipt and, when the
//! receipt originates from a purchase order, the agreed order prices.
//! Decides the payment-block status and feeds invoice price corrections
//! into the valuation ledger for invoices that are clear to pay.

use std::collections::HashMap;

use rust_decimal::Decimal;

use shared::models::{
    CorrectionFailure, CostCorrection, InvoiceLine, InvoiceStatus, LineMatch, LineMatchFlag,
    MatchReport, MovementKind, PurchaseOrderLine, ReceiptLine,
};
use shared::types::{IngredientId, InvoiceId};

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::repository::Repository;
use crate::services::valuation::{RecordMovementInput, ValuationLedger};

/// Reconciliation matcher service
#[derive(Clone)]
pub struct ReconciliationMatcher<R: Repository> {
    repo: R,
    ledger: ValuationLedger<R>,
    tolerance: Decimal,
}

impl<R: Repository> ReconciliationMatcher<R> {
    /// Create a new ReconciliationMatcher instance
    ///
    /// The ledger handle must be a clone of the one movements go through,
    /// so that corrections serialize with regular movements.
    pub fn new(repo: R, ledger: ValuationLedger<R>, config: &Config) -> Self {
        Self {
            repo,
            ledger,
            tolerance: config.matching.tolerance,
        }
    }

    /// Run the three-way match for one invoice
    ///
    /// Always upserts the resulting invoice status. Cost corrections are
    /// applied only when no line carries a critical flag; a blocked
    /// invoice never touches the valuation.
    pub async fn match_invoice(&self, invoice_id: InvoiceId) -> EngineResult<MatchReport> {
        let invoice = self
            .repo
            .invoice(invoice_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("invoice {}", invoice_id)))?;
        let receipt = self
            .repo
            .receipt(invoice.receipt_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "receipt {} linked by invoice {}",
                    invoice.receipt_id, invoice_id
                ))
            })?;

        let invoice_lines = self.repo.invoice_lines(invoice_id).await?;
        let receipt_lines = self.repo.receipt_lines(receipt.id).await?;
        let order_lines = match receipt.purchase_order_id {
            Some(order_id) => self.repo.order_lines(order_id).await?,
            None => Vec::new(),
        };

        let mut report = match_lines(
            invoice_id,
            &invoice_lines,
            &receipt_lines,
            &order_lines,
            self.tolerance,
        );

        self.repo
            .update_invoice_status(invoice_id, report.status)
            .await?;

        if report.is_blocked() {
            tracing::warn!(
                "Invoice {} ({}) blocked by three-way match",
                invoice_id,
                invoice.invoice_number
            );
            return Ok(report);
        }

        if report.requires_approval {
            tracing::warn!(
                "Invoice {} ({}) exceeds the price variance tolerance: invoiced {}, expected {}",
                invoice_id,
                invoice.invoice_number,
                report.invoiced_total,
                report.expected_total
            );
        }

        // Reconcile the booked receipt cost with the invoiced cost. A
        // failed correction is recorded and the remaining lines proceed.
        let candidates = std::mem::take(&mut report.corrections);
        for correction in candidates {
            let input = RecordMovementInput {
                ingredient_id: correction.ingredient_id,
                delta_quantity: Decimal::ZERO,
                total_amount: correction.amount,
                kind: MovementKind::Adjustment,
                reference_id: Some(invoice_id.0),
            };
            match self.ledger.apply_movement(input).await {
                Ok(_) => report.corrections.push(correction),
                Err(e) => {
                    tracing::error!(
                        "Failed to apply cost correction for ingredient {} on invoice {}: {}",
                        correction.ingredient_id,
                        invoice_id,
                        e
                    );
                    report.correction_failures.push(CorrectionFailure {
                        ingredient_id: correction.ingredient_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Match invoice lines against receipt and order lines.
///
/// Pure computation: the caller persists the status and applies the
/// candidate corrections. Corrections are only produced for an invoice
/// with no critical flags.
fn match_lines(
    invoice_id: InvoiceId,
    invoice_lines: &[InvoiceLine],
    receipt_lines: &[ReceiptLine],
    order_lines: &[PurchaseOrderLine],
    tolerance: Decimal,
) -> MatchReport {
    let received: HashMap<IngredientId, &ReceiptLine> = receipt_lines
        .iter()
        .map(|line| (line.ingredient_id, line))
        .collect();
    let agreed: HashMap<IngredientId, &PurchaseOrderLine> = order_lines
        .iter()
        .map(|line| (line.ingredient_id, line))
        .collect();

    let mut lines = Vec::with_capacity(invoice_lines.len());
    let mut corrections = Vec::new();
    let mut invoiced_total = Decimal::ZERO;
    let mut expected_total = Decimal::ZERO;

    for line in invoice_lines {
        invoiced_total += line.quantity * line.unit_price;

        let Some(receipt_line) = received.get(&line.ingredient_id) else {
            // Invoiced but never received. The line contributes its own
            // price to the expected total: it already blocks the invoice
            // and must not also inflate the price variance.
            expected_total += line.quantity * line.unit_price;
            lines.push(LineMatch {
                ingredient_id: line.ingredient_id,
                invoiced_quantity: line.quantity,
                invoiced_unit_price: line.unit_price,
                received_quantity: None,
                receipt_unit_price: None,
                flag: LineMatchFlag::UnmatchedLine,
            });
            continue;
        };

        // Agreed order price when there is one, else the booked receipt
        // price.
        let expected_price = agreed
            .get(&line.ingredient_id)
            .map(|order_line| order_line.unit_price)
            .unwrap_or(receipt_line.unit_price);
        expected_total += line.quantity * expected_price;

        let flag = if line.quantity > receipt_line.quantity {
            LineMatchFlag::QuantityExceedsReceipt
        } else {
            LineMatchFlag::QuantityMatched
        };

        if flag == LineMatchFlag::QuantityMatched {
            let amount = line.quantity * (line.unit_price - receipt_line.unit_price);
            if !amount.is_zero() {
                corrections.push(CostCorrection {
                    ingredient_id: line.ingredient_id,
                    amount,
                });
            }
        }

        lines.push(LineMatch {
            ingredient_id: line.ingredient_id,
            invoiced_quantity: line.quantity,
            invoiced_unit_price: line.unit_price,
            received_quantity: Some(receipt_line.quantity),
            receipt_unit_price: Some(receipt_line.unit_price),
            flag,
        });
    }

    let blocked = lines.iter().any(|line| line.flag.is_critical());
    let status = if blocked {
        InvoiceStatus::Blocked
    } else {
        InvoiceStatus::Pending
    };
    let requires_approval = (invoiced_total - expected_total).abs() > tolerance;

    MatchReport {
        invoice_id,
        status,
        lines,
        invoiced_total,
        expected_total,
        requires_approval,
        corrections: if blocked { Vec::new() } else { corrections },
        correction_failures: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn invoice_line(
        invoice_id: InvoiceId,
        ingredient_id: IngredientId,
        quantity: &str,
        unit_price: &str,
    ) -> InvoiceLine {
        InvoiceLine {
            id: Uuid::new_v4(),
            invoice_id,
            ingredient_id,
            quantity: dec(quantity),
            unit_price: dec(unit_price),
        }
    }

    fn receipt_line(ingredient_id: IngredientId, quantity: &str, unit_price: &str) -> ReceiptLine {
        ReceiptLine {
            id: Uuid::new_v4(),
            receipt_id: shared::types::ReceiptId::new(),
            ingredient_id,
            quantity: dec(quantity),
            unit_price: dec(unit_price),
        }
    }

    #[test]
    fn test_matched_lines_produce_pending_status() {
        let invoice_id = InvoiceId::new();
        let ingredient_id = IngredientId::new();
        let report = match_lines(
            invoice_id,
            &[invoice_line(invoice_id, ingredient_id, "5", "100")],
            &[receipt_line(ingredient_id, "5", "100")],
            &[],
            dec("1000"),
        );

        assert_eq!(report.status, InvoiceStatus::Pending);
        assert_eq!(report.lines[0].flag, LineMatchFlag::QuantityMatched);
        assert!(!report.requires_approval);
        assert!(report.corrections.is_empty());
    }

    #[test]
    fn test_unmatched_line_blocks_invoice() {
        let invoice_id = InvoiceId::new();
        let report = match_lines(
            invoice_id,
            &[invoice_line(invoice_id, IngredientId::new(), "5", "100")],
            &[],
            &[],
            dec("1000"),
        );

        assert_eq!(report.status, InvoiceStatus::Blocked);
        assert_eq!(report.lines[0].flag, LineMatchFlag::UnmatchedLine);
        // Unmatched lines contribute no price variance of their own.
        assert_eq!(report.invoiced_total, report.expected_total);
    }

    #[test]
    fn test_quantity_over_receipt_blocks_invoice() {
        let invoice_id = InvoiceId::new();
        let ingredient_id = IngredientId::new();
        let report = match_lines(
            invoice_id,
            &[invoice_line(invoice_id, ingredient_id, "6", "100")],
            &[receipt_line(ingredient_id, "5", "100")],
            &[],
            dec("1000"),
        );

        assert_eq!(report.status, InvoiceStatus::Blocked);
        assert_eq!(report.lines[0].flag, LineMatchFlag::QuantityExceedsReceipt);
        assert!(report.corrections.is_empty());
    }

    #[test]
    fn test_price_variance_above_tolerance_requires_approval() {
        let invoice_id = InvoiceId::new();
        let ingredient_id = IngredientId::new();
        let report = match_lines(
            invoice_id,
            &[invoice_line(invoice_id, ingredient_id, "10", "250")],
            &[receipt_line(ingredient_id, "10", "100")],
            &[],
            dec("1000"),
        );

        // 2500 invoiced vs 1000 expected: variance 1500 > 1000.
        assert_eq!(report.status, InvoiceStatus::Pending);
        assert!(report.requires_approval);
        assert_eq!(report.price_variance(), dec("1500"));
    }

    #[test]
    fn test_price_variance_at_tolerance_passes() {
        let invoice_id = InvoiceId::new();
        let ingredient_id = IngredientId::new();
        let report = match_lines(
            invoice_id,
            &[invoice_line(invoice_id, ingredient_id, "10", "200")],
            &[receipt_line(ingredient_id, "10", "100")],
            &[],
            dec("1000"),
        );

        // Variance of exactly 1000 is tolerated.
        assert!(!report.requires_approval);
    }

    #[test]
    fn test_order_price_wins_over_receipt_price() {
        let invoice_id = InvoiceId::new();
        let ingredient_id = IngredientId::new();
        let order_id = shared::types::PurchaseOrderId::new();
        let order_line = PurchaseOrderLine {
            id: Uuid::new_v4(),
            purchase_order_id: order_id,
            ingredient_id,
            quantity: dec("10"),
            unit_price: dec("120"),
        };
        let report = match_lines(
            invoice_id,
            &[invoice_line(invoice_id, ingredient_id, "10", "120")],
            &[receipt_line(ingredient_id, "10", "100")],
            &[order_line],
            dec("1000"),
        );

        // Expected total uses the agreed order price, so there is no
        // variance even though the receipt was booked cheaper.
        assert_eq!(report.expected_total, dec("1200"));
        assert!(!report.requires_approval);
        // The ledger correction still trues the booked receipt cost up.
        assert_eq!(report.corrections.len(), 1);
        assert_eq!(report.corrections[0].amount, dec("200"));
    }

    #[test]
    fn test_identical_prices_produce_no_correction() {
        let invoice_id = InvoiceId::new();
        let ingredient_id = IngredientId::new();
        let report = match_lines(
            invoice_id,
            &[invoice_line(invoice_id, ingredient_id, "5", "80")],
            &[receipt_line(ingredient_id, "5", "80")],
            &[],
            dec("1000"),
        );

        assert!(report.corrections.is_empty());
    }

    #[test]
    fn test_negative_correction_for_cheaper_invoice() {
        let invoice_id = InvoiceId::new();
        let ingredient_id = IngredientId::new();
        let report = match_lines(
            invoice_id,
            &[invoice_line(invoice_id, ingredient_id, "4", "90")],
            &[receipt_line(ingredient_id, "5", "100")],
            &[],
            dec("1000"),
        );

        // 4 x (90 - 100) = -40: the stock was booked too expensive.
        assert_eq!(report.corrections.len(), 1);
        assert_eq!(report.corrections[0].amount, dec("-40"));
    }
}
