//! PostgreSQL repository adapter
//!
//! Production implementation of the repository trait. Every lookup is an
//! indexed `WHERE` query; row structs stay private and convert into the
//! shared record types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{
    GoodsReceipt, Ingredient, IngredientCategory, InvoiceLine, InvoiceStatus, PurchaseOrder,
    PurchaseOrderLine, ReceiptLine, Recipe, RecipeLine, SaleEvent, StockMovement, StockValuation,
    SupplierInvoice,
};
use shared::types::{
    CategoryId, DateRange, IngredientId, InvoiceId, PurchaseOrderId, ReceiptId, RecipeId, SaleId,
};

use crate::error::{EngineError, EngineResult};

use super::Repository;

/// sqlx-backed repository used by the batch binary and services
#[derive(Clone)]
pub struct PgRepository {
    db: PgPool,
}

impl PgRepository {
    /// Create a new PgRepository instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromRow)]
struct IngredientRow {
    id: Uuid,
    name: String,
    category_id: Option<Uuid>,
    conversion_factor: Decimal,
    purchase_unit: String,
    usage_unit: String,
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Self {
            id: IngredientId(row.id),
            name: row.name,
            category_id: row.category_id.map(CategoryId),
            conversion_factor: row.conversion_factor,
            purchase_unit: row.purchase_unit,
            usage_unit: row.usage_unit,
        }
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
}

impl From<CategoryRow> for IngredientCategory {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug, FromRow)]
struct ValuationRow {
    ingredient_id: Uuid,
    quantity_on_hand: Decimal,
    weighted_average_cost: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<ValuationRow> for StockValuation {
    fn from(row: ValuationRow) -> Self {
        Self {
            ingredient_id: IngredientId(row.ingredient_id),
            quantity_on_hand: row.quantity_on_hand,
            weighted_average_cost: row.weighted_average_cost,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: Uuid,
    name: String,
    sale_price: Option<Decimal>,
    theoretical_cost: Decimal,
    cost_updated_at: Option<DateTime<Utc>>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: RecipeId(row.id),
            name: row.name,
            sale_price: row.sale_price,
            theoretical_cost: row.theoretical_cost,
            cost_updated_at: row.cost_updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RecipeLineRow {
    id: Uuid,
    recipe_id: Uuid,
    ingredient_id: Uuid,
    quantity: Decimal,
}

impl From<RecipeLineRow> for RecipeLine {
    fn from(row: RecipeLineRow) -> Self {
        Self {
            id: row.id,
            recipe_id: RecipeId(row.recipe_id),
            ingredient_id: IngredientId(row.ingredient_id),
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    supplier_name: String,
    ordered_on: NaiveDate,
}

impl From<OrderRow> for PurchaseOrder {
    fn from(row: OrderRow) -> Self {
        Self {
            id: PurchaseOrderId(row.id),
            supplier_name: row.supplier_name,
            ordered_on: row.ordered_on,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderLineRow {
    id: Uuid,
    purchase_order_id: Uuid,
    ingredient_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
}

impl From<OrderLineRow> for PurchaseOrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: row.id,
            purchase_order_id: PurchaseOrderId(row.purchase_order_id),
            ingredient_id: IngredientId(row.ingredient_id),
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: Uuid,
    purchase_order_id: Option<Uuid>,
    received_on: NaiveDate,
}

impl From<ReceiptRow> for GoodsReceipt {
    fn from(row: ReceiptRow) -> Self {
        Self {
            id: ReceiptId(row.id),
            purchase_order_id: row.purchase_order_id.map(PurchaseOrderId),
            received_on: row.received_on,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReceiptLineRow {
    id: Uuid,
    receipt_id: Uuid,
    ingredient_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
}

impl From<ReceiptLineRow> for ReceiptLine {
    fn from(row: ReceiptLineRow) -> Self {
        Self {
            id: row.id,
            receipt_id: ReceiptId(row.receipt_id),
            ingredient_id: IngredientId(row.ingredient_id),
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    receipt_id: Uuid,
    invoice_number: String,
    status: String,
}

impl From<InvoiceRow> for SupplierInvoice {
    fn from(row: InvoiceRow) -> Self {
        let status = match row.status.as_str() {
            "blocked" => InvoiceStatus::Blocked,
            _ => InvoiceStatus::Pending,
        };
        Self {
            id: InvoiceId(row.id),
            receipt_id: ReceiptId(row.receipt_id),
            invoice_number: row.invoice_number,
            status,
        }
    }
}

#[derive(Debug, FromRow)]
struct InvoiceLineRow {
    id: Uuid,
    invoice_id: Uuid,
    ingredient_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
}

impl From<InvoiceLineRow> for InvoiceLine {
    fn from(row: InvoiceLineRow) -> Self {
        Self {
            id: row.id,
            invoice_id: InvoiceId(row.invoice_id),
            ingredient_id: IngredientId(row.ingredient_id),
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    recipe_id: Uuid,
    quantity_sold: Decimal,
    sold_on: NaiveDate,
}

impl From<SaleRow> for SaleEvent {
    fn from(row: SaleRow) -> Self {
        Self {
            id: SaleId(row.id),
            recipe_id: RecipeId(row.recipe_id),
            quantity_sold: row.quantity_sold,
            sold_on: row.sold_on,
        }
    }
}

impl Repository for PgRepository {
    async fn ingredient(&self, id: IngredientId) -> EngineResult<Option<Ingredient>> {
        let row = sqlx::query_as::<_, IngredientRow>(
            r#"
            SELECT id, name, category_id, conversion_factor, purchase_unit, usage_unit
            FROM ingredients
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Ingredient::from))
    }

    async fn category(&self, id: CategoryId) -> EngineResult<Option<IngredientCategory>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name FROM ingredient_categories WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(IngredientCategory::from))
    }

    async fn valuation(&self, id: IngredientId) -> EngineResult<Option<StockValuation>> {
        let row = sqlx::query_as::<_, ValuationRow>(
            r#"
            SELECT ingredient_id, quantity_on_hand, weighted_average_cost, updated_at
            FROM stock_valuations
            WHERE ingredient_id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(StockValuation::from))
    }

    async fn recipe(&self, id: RecipeId) -> EngineResult<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, name, sale_price, theoretical_cost, cost_updated_at
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Recipe::from))
    }

    async fn purchase_order(&self, id: PurchaseOrderId) -> EngineResult<Option<PurchaseOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, supplier_name, ordered_on FROM purchase_orders WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(PurchaseOrder::from))
    }

    async fn receipt(&self, id: ReceiptId) -> EngineResult<Option<GoodsReceipt>> {
        let row = sqlx::query_as::<_, ReceiptRow>(
            "SELECT id, purchase_order_id, received_on FROM goods_receipts WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(GoodsReceipt::from))
    }

    async fn invoice(&self, id: InvoiceId) -> EngineResult<Option<SupplierInvoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, receipt_id, invoice_number, status
            FROM supplier_invoices
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(SupplierInvoice::from))
    }

    async fn recipe_lines_for_ingredient(
        &self,
        id: IngredientId,
    ) -> EngineResult<Vec<RecipeLine>> {
        let rows = sqlx::query_as::<_, RecipeLineRow>(
            r#"
            SELECT id, recipe_id, ingredient_id, quantity
            FROM recipe_lines
            WHERE ingredient_id = $1
            ORDER BY recipe_id, id
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(RecipeLine::from).collect())
    }

    async fn recipe_lines_for_recipe(&self, id: RecipeId) -> EngineResult<Vec<RecipeLine>> {
        let rows = sqlx::query_as::<_, RecipeLineRow>(
            r#"
            SELECT id, recipe_id, ingredient_id, quantity
            FROM recipe_lines
            WHERE recipe_id = $1
            ORDER BY id
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(RecipeLine::from).collect())
    }

    async fn order_lines(&self, id: PurchaseOrderId) -> EngineResult<Vec<PurchaseOrderLine>> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r#"
            SELECT id, purchase_order_id, ingredient_id, quantity, unit_price
            FROM purchase_order_lines
            WHERE purchase_order_id = $1
            ORDER BY id
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(PurchaseOrderLine::from).collect())
    }

    async fn receipt_lines(&self, id: ReceiptId) -> EngineResult<Vec<ReceiptLine>> {
        let rows = sqlx::query_as::<_, ReceiptLineRow>(
            r#"
            SELECT id, receipt_id, ingredient_id, quantity, unit_price
            FROM receipt_lines
            WHERE receipt_id = $1
            ORDER BY id
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ReceiptLine::from).collect())
    }

    async fn invoice_lines(&self, id: InvoiceId) -> EngineResult<Vec<InvoiceLine>> {
        let rows = sqlx::query_as::<_, InvoiceLineRow>(
            r#"
            SELECT id, invoice_id, ingredient_id, quantity, unit_price
            FROM invoice_lines
            WHERE invoice_id = $1
            ORDER BY id
            "#,
        )
        .bind(id.0)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(InvoiceLine::from).collect())
    }

    async fn sales_in_range(&self, range: DateRange) -> EngineResult<Vec<SaleEvent>> {
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, recipe_id, quantity_sold, sold_on
            FROM sale_events
            WHERE sold_on BETWEEN $1 AND $2
            ORDER BY sold_on, id
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(SaleEvent::from).collect())
    }

    async fn receipt_lines_in_range(&self, range: DateRange) -> EngineResult<Vec<ReceiptLine>> {
        let rows = sqlx::query_as::<_, ReceiptLineRow>(
            r#"
            SELECT rl.id, rl.receipt_id, rl.ingredient_id, rl.quantity, rl.unit_price
            FROM receipt_lines rl
            JOIN goods_receipts gr ON gr.id = rl.receipt_id
            WHERE gr.received_on BETWEEN $1 AND $2
            ORDER BY gr.received_on, rl.id
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ReceiptLine::from).collect())
    }

    async fn upsert_valuation(&self, valuation: &StockValuation) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_valuations (ingredient_id, quantity_on_hand, weighted_average_cost, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ingredient_id)
            DO UPDATE SET quantity_on_hand = EXCLUDED.quantity_on_hand,
                          weighted_average_cost = EXCLUDED.weighted_average_cost,
                          updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(valuation.ingredient_id.0)
        .bind(valuation.quantity_on_hand)
        .bind(valuation.weighted_average_cost)
        .bind(valuation.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn append_movement(&self, movement: &StockMovement) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (id, ingredient_id, delta_quantity, kind, amount, reference_id, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(movement.id.0)
        .bind(movement.ingredient_id.0)
        .bind(movement.delta_quantity)
        .bind(movement.kind.as_str())
        .bind(movement.amount)
        .bind(movement.reference_id)
        .bind(movement.occurred_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn update_recipe_cost(
        &self,
        id: RecipeId,
        theoretical_cost: Decimal,
    ) -> EngineResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE recipes
            SET theoretical_cost = $2, cost_updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(theoretical_cost)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("recipe {}", id)));
        }

        Ok(())
    }

    async fn update_invoice_status(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
    ) -> EngineResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE supplier_invoices
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(status.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("invoice {}", id)));
        }

        Ok(())
    }
}
