//! Validation utilities for the Larder cost-accounting platform
//!
//! Lightweight checks applied at the engine boundary before records enter
//! the valuation or matching paths.

use rust_decimal::Decimal;

use crate::types::DateRange;

// ============================================================================
// Stock Movement Validations
// ============================================================================

/// Validate the quantity/amount pair of a stock movement
///
/// A movement must carry either a quantity change or a monetary value
/// (zero-quantity adjustments are how invoice corrections re-average the
/// cost basis), and an inbound quantity must not carry negative money.
pub fn validate_movement(delta_quantity: Decimal, total_amount: Decimal) -> Result<(), &'static str> {
    if delta_quantity.is_zero() && total_amount.is_zero() {
        return Err("Movement must change quantity or carry an amount");
    }
    if delta_quantity > Decimal::ZERO && total_amount < Decimal::ZERO {
        return Err("Inbound movement cannot carry a negative amount");
    }
    Ok(())
}

/// Validate an ingredient's purchase-to-usage conversion factor
pub fn validate_conversion_factor(factor: Decimal) -> Result<(), &'static str> {
    if factor <= Decimal::ZERO {
        return Err("Conversion factor must be positive");
    }
    Ok(())
}

// ============================================================================
// Document Line Validations
// ============================================================================

/// Validate a document line (order, receipt or invoice)
pub fn validate_document_line(quantity: Decimal, unit_price: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Line quantity must be positive");
    }
    if unit_price < Decimal::ZERO {
        return Err("Line unit price cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Period Validations
// ============================================================================

/// Validate that a reporting period is not inverted
pub fn validate_date_range(range: &DateRange) -> Result<(), &'static str> {
    if range.start > range.end {
        return Err("Period start must not be after its end");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ========================================================================
    // Stock Movement Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_movement_inbound() {
        assert!(validate_movement(dec("10"), dec("1000")).is_ok());
    }

    #[test]
    fn test_validate_movement_outbound() {
        assert!(validate_movement(dec("-3"), Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_validate_movement_value_adjustment() {
        // Zero quantity with money attached: invoice price correction.
        assert!(validate_movement(Decimal::ZERO, dec("120.50")).is_ok());
        assert!(validate_movement(Decimal::ZERO, dec("-75")).is_ok());
    }

    #[test]
    fn test_validate_movement_noop_rejected() {
        assert!(validate_movement(Decimal::ZERO, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_validate_movement_negative_inbound_amount_rejected() {
        assert!(validate_movement(dec("5"), dec("-1")).is_err());
    }

    #[test]
    fn test_validate_conversion_factor() {
        assert!(validate_conversion_factor(dec("25000")).is_ok());
        assert!(validate_conversion_factor(dec("0.5")).is_ok());
        assert!(validate_conversion_factor(Decimal::ZERO).is_err());
        assert!(validate_conversion_factor(dec("-1")).is_err());
    }

    // ========================================================================
    // Document Line Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_document_line_valid() {
        assert!(validate_document_line(dec("5"), dec("12.40")).is_ok());
        assert!(validate_document_line(dec("0.25"), Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_validate_document_line_invalid() {
        assert!(validate_document_line(Decimal::ZERO, dec("10")).is_err());
        assert!(validate_document_line(dec("-2"), dec("10")).is_err());
        assert!(validate_document_line(dec("2"), dec("-10")).is_err());
    }

    // ========================================================================
    // Period Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_date_range() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        assert!(validate_date_range(&DateRange::new(start, end)).is_ok());
        assert!(validate_date_range(&DateRange::new(start, start)).is_ok());
        assert!(validate_date_range(&DateRange::new(end, start)).is_err());
    }
}
