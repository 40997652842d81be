//! Purchase order, goods receipt and supplier invoice models
//!
//! These documents are created by the purchasing workflows and are
//! read-mostly inputs to the reconciliation matcher; the engine only ever
//! writes the invoice `status` field.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{IngredientId, InvoiceId, PurchaseOrderId, ReceiptId};

/// A purchase order sent to a supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub supplier_name: String,
    pub ordered_on: NaiveDate,
}

/// One ordered ingredient with the agreed price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub purchase_order_id: PurchaseOrderId,
    pub ingredient_id: IngredientId,
    /// Quantity in purchase units.
    pub quantity: Decimal,
    /// Agreed currency per purchase unit.
    pub unit_price: Decimal,
}

/// Goods physically received from a supplier
///
/// Receipts normally originate from a purchase order, but direct
/// deliveries without one exist in some flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsReceipt {
    pub id: ReceiptId,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub received_on: NaiveDate,
}

/// One received ingredient with the price booked at receiving time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub id: Uuid,
    pub receipt_id: ReceiptId,
    pub ingredient_id: IngredientId,
    /// Quantity in purchase units.
    pub quantity: Decimal,
    /// Estimated currency per purchase unit at receiving time.
    pub unit_price: Decimal,
}

/// Payment status of a supplier invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Awaiting the normal payment workflow.
    Pending,
    /// Payment must not proceed until the discrepancy is resolved.
    Blocked,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Blocked => "blocked",
        }
    }
}

/// A supplier invoice referencing exactly one goods receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierInvoice {
    pub id: InvoiceId,
    pub receipt_id: ReceiptId,
    pub invoice_number: String,
    pub status: InvoiceStatus,
}

/// One invoiced ingredient; created once by the caller, never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: Uuid,
    pub invoice_id: InvoiceId,
    pub ingredient_id: IngredientId,
    /// Quantity in purchase units.
    pub quantity: Decimal,
    /// Invoiced currency per purchase unit.
    pub unit_price: Decimal,
}
