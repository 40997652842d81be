//! In-memory repository for tests and demos
//!
//! Hash maps behind a read-write lock. The seed methods stand in for the
//! external CRUD layer that owns master data and procurement documents.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use rust_decimal::Decimal;

use shared::models::{
    GoodsReceipt, Ingredient, IngredientCategory, InvoiceLine, InvoiceStatus, PurchaseOrder,
    PurchaseOrderLine, ReceiptLine, Recipe, RecipeLine, SaleEvent, StockMovement, StockValuation,
    SupplierInvoice,
};
use shared::types::{
    CategoryId, DateRange, IngredientId, InvoiceId, PurchaseOrderId, ReceiptId, RecipeId,
};

use crate::error::{EngineError, EngineResult};

use super::Repository;

#[derive(Debug, Default)]
struct Store {
    ingredients: HashMap<IngredientId, Ingredient>,
    categories: HashMap<CategoryId, IngredientCategory>,
    valuations: HashMap<IngredientId, StockValuation>,
    movements: Vec<StockMovement>,
    recipes: HashMap<RecipeId, Recipe>,
    recipe_lines: Vec<RecipeLine>,
    purchase_orders: HashMap<PurchaseOrderId, PurchaseOrder>,
    order_lines: Vec<PurchaseOrderLine>,
    receipts: HashMap<ReceiptId, GoodsReceipt>,
    receipt_lines: Vec<ReceiptLine>,
    invoices: HashMap<InvoiceId, SupplierInvoice>,
    invoice_lines: Vec<InvoiceLine>,
    sales: Vec<SaleEvent>,
}

/// Hash-map repository; clones share one store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    // === Seed methods (the external CRUD layer's job) ===

    pub fn insert_ingredient(&self, ingredient: Ingredient) {
        self.write().ingredients.insert(ingredient.id, ingredient);
    }

    pub fn insert_category(&self, category: IngredientCategory) {
        self.write().categories.insert(category.id, category);
    }

    pub fn insert_recipe(&self, recipe: Recipe, lines: Vec<RecipeLine>) {
        let mut store = self.write();
        store.recipes.insert(recipe.id, recipe);
        store.recipe_lines.extend(lines);
    }

    /// Technical-sheet lines can exist independently of a recipe record.
    pub fn insert_recipe_lines(&self, lines: Vec<RecipeLine>) {
        self.write().recipe_lines.extend(lines);
    }

    pub fn insert_purchase_order(&self, order: PurchaseOrder, lines: Vec<PurchaseOrderLine>) {
        let mut store = self.write();
        store.purchase_orders.insert(order.id, order);
        store.order_lines.extend(lines);
    }

    pub fn insert_receipt(&self, receipt: GoodsReceipt, lines: Vec<ReceiptLine>) {
        let mut store = self.write();
        store.receipts.insert(receipt.id, receipt);
        store.receipt_lines.extend(lines);
    }

    pub fn insert_invoice(&self, invoice: SupplierInvoice, lines: Vec<InvoiceLine>) {
        let mut store = self.write();
        store.invoices.insert(invoice.id, invoice);
        store.invoice_lines.extend(lines);
    }

    pub fn insert_sale(&self, sale: SaleEvent) {
        self.write().sales.push(sale);
    }

    /// Recorded movements, oldest first. The trait exposes no movement
    /// read because the ledger is append-only; tests inspect it here.
    pub fn movements(&self) -> Vec<StockMovement> {
        self.read().movements.clone()
    }
}

impl Repository for InMemoryRepository {
    async fn ingredient(&self, id: IngredientId) -> EngineResult<Option<Ingredient>> {
        Ok(self.read().ingredients.get(&id).cloned())
    }

    async fn category(&self, id: CategoryId) -> EngineResult<Option<IngredientCategory>> {
        Ok(self.read().categories.get(&id).cloned())
    }

    async fn valuation(&self, id: IngredientId) -> EngineResult<Option<StockValuation>> {
        Ok(self.read().valuations.get(&id).cloned())
    }

    async fn recipe(&self, id: RecipeId) -> EngineResult<Option<Recipe>> {
        Ok(self.read().recipes.get(&id).cloned())
    }

    async fn purchase_order(&self, id: PurchaseOrderId) -> EngineResult<Option<PurchaseOrder>> {
        Ok(self.read().purchase_orders.get(&id).cloned())
    }

    async fn receipt(&self, id: ReceiptId) -> EngineResult<Option<GoodsReceipt>> {
        Ok(self.read().receipts.get(&id).cloned())
    }

    async fn invoice(&self, id: InvoiceId) -> EngineResult<Option<SupplierInvoice>> {
        Ok(self.read().invoices.get(&id).cloned())
    }

    async fn recipe_lines_for_ingredient(
        &self,
        id: IngredientId,
    ) -> EngineResult<Vec<RecipeLine>> {
        Ok(self
            .read()
            .recipe_lines
            .iter()
            .filter(|line| line.ingredient_id == id)
            .cloned()
            .collect())
    }

    async fn recipe_lines_for_recipe(&self, id: RecipeId) -> EngineResult<Vec<RecipeLine>> {
        Ok(self
            .read()
            .recipe_lines
            .iter()
            .filter(|line| line.recipe_id == id)
            .cloned()
            .collect())
    }

    async fn order_lines(&self, id: PurchaseOrderId) -> EngineResult<Vec<PurchaseOrderLine>> {
        Ok(self
            .read()
            .order_lines
            .iter()
            .filter(|line| line.purchase_order_id == id)
            .cloned()
            .collect())
    }

    async fn receipt_lines(&self, id: ReceiptId) -> EngineResult<Vec<ReceiptLine>> {
        Ok(self
            .read()
            .receipt_lines
            .iter()
            .filter(|line| line.receipt_id == id)
            .cloned()
            .collect())
    }

    async fn invoice_lines(&self, id: InvoiceId) -> EngineResult<Vec<InvoiceLine>> {
        Ok(self
            .read()
            .invoice_lines
            .iter()
            .filter(|line| line.invoice_id == id)
            .cloned()
            .collect())
    }

    async fn sales_in_range(&self, range: DateRange) -> EngineResult<Vec<SaleEvent>> {
        Ok(self
            .read()
            .sales
            .iter()
            .filter(|sale| range.contains(sale.sold_on))
            .cloned()
            .collect())
    }

    async fn receipt_lines_in_range(&self, range: DateRange) -> EngineResult<Vec<ReceiptLine>> {
        let store = self.read();
        Ok(store
            .receipt_lines
            .iter()
            .filter(|line| {
                store
                    .receipts
                    .get(&line.receipt_id)
                    .map_or(false, |receipt| range.contains(receipt.received_on))
            })
            .cloned()
            .collect())
    }

    async fn upsert_valuation(&self, valuation: &StockValuation) -> EngineResult<()> {
        self.write()
            .valuations
            .insert(valuation.ingredient_id, valuation.clone());
        Ok(())
    }

    async fn append_movement(&self, movement: &StockMovement) -> EngineResult<()> {
        let mut store = self.write();
        if store.movements.iter().any(|m| m.id == movement.id) {
            return Err(EngineError::Conflict(format!(
                "movement {} already recorded",
                movement.id
            )));
        }
        store.movements.push(movement.clone());
        Ok(())
    }

    async fn update_recipe_cost(
        &self,
        id: RecipeId,
        theoretical_cost: Decimal,
    ) -> EngineResult<()> {
        let mut store = self.write();
        match store.recipes.get_mut(&id) {
            Some(recipe) => {
                recipe.theoretical_cost = theoretical_cost;
                recipe.cost_updated_at = Some(Utc::now());
                Ok(())
            }
            None => Err(EngineError::NotFound(format!("recipe {}", id))),
        }
    }

    async fn update_invoice_status(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
    ) -> EngineResult<()> {
        let mut store = self.write();
        match store.invoices.get_mut(&id) {
            Some(invoice) => {
                invoice.status = status;
                Ok(())
            }
            None => Err(EngineError::NotFound(format!("invoice {}", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn append_movement_rejects_duplicate_ids() {
        let repo = InMemoryRepository::new();
        let movement = StockMovement {
            id: shared::types::MovementId::new(),
            ingredient_id: IngredientId::new(),
            delta_quantity: dec("5"),
            kind: shared::models::MovementKind::Receipt,
            amount: dec("500"),
            reference_id: None,
            occurred_at: Utc::now(),
        };

        repo.append_movement(&movement).await.unwrap();
        let err = repo.append_movement(&movement).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[tokio::test]
    async fn receipt_lines_in_range_follows_the_receipt_date() {
        let repo = InMemoryRepository::new();
        let ingredient_id = IngredientId::new();

        let inside = GoodsReceipt {
            id: ReceiptId::new(),
            purchase_order_id: None,
            received_on: chrono::NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        };
        let outside = GoodsReceipt {
            id: ReceiptId::new(),
            purchase_order_id: None,
            received_on: chrono::NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
        };
        for receipt in [&inside, &outside] {
            repo.insert_receipt(
                receipt.clone(),
                vec![ReceiptLine {
                    id: uuid::Uuid::new_v4(),
                    receipt_id: receipt.id,
                    ingredient_id,
                    quantity: dec("10"),
                    unit_price: dec("25"),
                }],
            );
        }

        let range = DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );
        let lines = repo.receipt_lines_in_range(range).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].receipt_id, inside.id);
    }
}
