//! Repository abstraction over the external record store
//!
//! The engine never scans whole collections: every read is by id, by
//! foreign key, or by date range, and every write targets one record.
//! `InMemoryRepository` backs tests and demos; `PgRepository` is the
//! production PostgreSQL adapter.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

use rust_decimal::Decimal;

use shared::models::{
    GoodsReceipt, Ingredient, IngredientCategory, InvoiceLine, InvoiceStatus, PurchaseOrder,
    PurchaseOrderLine, ReceiptLine, Recipe, RecipeLine, SaleEvent, StockMovement, StockValuation,
    SupplierInvoice,
};
use shared::types::{
    CategoryId, DateRange, IngredientId, InvoiceId, PurchaseOrderId, ReceiptId, RecipeId,
};

use crate::error::EngineResult;

/// Indexed read/write access to the platform's records.
///
/// Implementations must be cheap to clone; clones share one underlying
/// store. Reads return `None` for a missing record rather than an error so
/// that callers can decide between degrading and failing.
#[allow(async_fn_in_trait)]
pub trait Repository: Clone + Send + Sync + 'static {
    // Fetch by id
    async fn ingredient(&self, id: IngredientId) -> EngineResult<Option<Ingredient>>;
    async fn category(&self, id: CategoryId) -> EngineResult<Option<IngredientCategory>>;
    async fn valuation(&self, id: IngredientId) -> EngineResult<Option<StockValuation>>;
    async fn recipe(&self, id: RecipeId) -> EngineResult<Option<Recipe>>;
    async fn purchase_order(&self, id: PurchaseOrderId) -> EngineResult<Option<PurchaseOrder>>;
    async fn receipt(&self, id: ReceiptId) -> EngineResult<Option<GoodsReceipt>>;
    async fn invoice(&self, id: InvoiceId) -> EngineResult<Option<SupplierInvoice>>;

    // Fetch by foreign key
    async fn recipe_lines_for_ingredient(&self, id: IngredientId)
        -> EngineResult<Vec<RecipeLine>>;
    async fn recipe_lines_for_recipe(&self, id: RecipeId) -> EngineResult<Vec<RecipeLine>>;
    async fn order_lines(&self, id: PurchaseOrderId) -> EngineResult<Vec<PurchaseOrderLine>>;
    async fn receipt_lines(&self, id: ReceiptId) -> EngineResult<Vec<ReceiptLine>>;
    async fn invoice_lines(&self, id: InvoiceId) -> EngineResult<Vec<InvoiceLine>>;

    // Range queries
    async fn sales_in_range(&self, range: DateRange) -> EngineResult<Vec<SaleEvent>>;
    async fn receipt_lines_in_range(&self, range: DateRange) -> EngineResult<Vec<ReceiptLine>>;

    // Writes
    async fn upsert_valuation(&self, valuation: &StockValuation) -> EngineResult<()>;
    async fn append_movement(&self, movement: &StockMovement) -> EngineResult<()>;
    async fn update_recipe_cost(&self, id: RecipeId, theoretical_cost: Decimal)
        -> EngineResult<()>;
    async fn update_invoice_status(&self, id: InvoiceId, status: InvoiceStatus)
        -> EngineResult<()>;
}
