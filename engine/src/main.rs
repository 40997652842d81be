//! Larder batch runner
//!
//! Runs the engine operations that live outside the interactive flows:
//! exporting variance reports, finishing deferred cascade work and
//! re-running invoice matches.
//!
//! Usage:
//!   larder-batch variance <start> <end>   print the period report as CSV
//!   larder-batch recompute <recipe-id>    recompute one recipe snapshot
//!   larder-batch match <invoice-id>       run the three-way match

use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use larder_engine::{Config, Engine, EngineError, PgRepository, Repository};
use shared::types::{DateRange, InvoiceId, RecipeId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "larder_batch=info,larder_engine=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Larder batch runner");
    tracing::info!("Environment: {}", config.environment);

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    let repo = PgRepository::new(db_pool);
    let engine = Engine::new(repo.clone(), &config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run_command(&engine, &repo, &args).await {
        match e.downcast_ref::<EngineError>() {
            Some(engine_error) => tracing::error!(
                "Batch command failed [{}]: {}",
                engine_error.error_code(),
                engine_error
            ),
            None => tracing::error!("Batch command failed: {}", e),
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run_command(
    engine: &Engine<PgRepository>,
    repo: &PgRepository,
    args: &[String],
) -> anyhow::Result<()> {
    match args {
        [command, start, end] if command == "variance" => {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")?;

            let report = engine.compute_gap(DateRange::new(start, end)).await?;
            tracing::info!(
                "Variance report for {} to {}: {} ingredients, {} alerts",
                start,
                end,
                report.entries.len(),
                report.alerts().count()
            );
            print!("{}", export_to_csv(&report.entries)?);
        }
        [command, recipe_id] if command == "recompute" => {
            let recipe_id = RecipeId(Uuid::parse_str(recipe_id)?);

            let cost = engine.recompute_recipe(recipe_id).await?;
            tracing::info!("Recipe {} recomputed: theoretical cost {}", recipe_id, cost);
            println!("{}", cost);
        }
        [command, invoice_id] if command == "match" => {
            let invoice_id = InvoiceId(Uuid::parse_str(invoice_id)?);

            let report = engine.match_invoice(invoice_id).await?;
            if let Some(supplier) = supplier_for_invoice(repo, invoice_id).await? {
                tracing::info!("Invoice {} is from supplier {}", invoice_id, supplier);
            }
            tracing::info!(
                "Invoice {} matched: status {}, {} corrections, {} failures",
                invoice_id,
                report.status.as_str(),
                report.corrections.len(),
                report.correction_failures.len()
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            eprintln!("Usage:");
            eprintln!("  larder-batch variance <start:YYYY-MM-DD> <end:YYYY-MM-DD>");
            eprintln!("  larder-batch recompute <recipe-id>");
            eprintln!("  larder-batch match <invoice-id>");
            std::process::exit(2);
        }
    }

    Ok(())
}

/// Supplier behind an invoice, following invoice -> receipt -> order
async fn supplier_for_invoice(
    repo: &PgRepository,
    invoice_id: InvoiceId,
) -> anyhow::Result<Option<String>> {
    let Some(invoice) = repo.invoice(invoice_id).await? else {
        return Ok(None);
    };
    let Some(receipt) = repo.receipt(invoice.receipt_id).await? else {
        return Ok(None);
    };
    let Some(order_id) = receipt.purchase_order_id else {
        return Ok(None);
    };
    Ok(repo
        .purchase_order(order_id)
        .await?
        .map(|order| order.supplier_name))
}

/// Export records as CSV
fn export_to_csv<T: Serialize>(data: &[T]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in data {
        wtr.serialize(record)
            .map_err(|e| anyhow::anyhow!("CSV serialization error: {}", e))?;
    }
    let csv_data = String::from_utf8(
        wtr.into_inner()
            .map_err(|e| anyhow::anyhow!("CSV writer error: {}", e))?,
    )
    .map_err(|e| anyhow::anyhow!("UTF-8 conversion error: {}", e))?;
    Ok(csv_data)
}
