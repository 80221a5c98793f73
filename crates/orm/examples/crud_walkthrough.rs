//! CRUD walkthrough
//!
//! Creates, finds, updates and deletes a product against an in-memory SQLite
//! database. Run with `RUST_LOG=storefront_orm=debug` to see every statement.

use anyhow::Context;
use serde_json::json;
use storefront_orm::models::Product;
use storefront_orm::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PRODUCTS_DDL: &str = "CREATE TABLE products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id INTEGER,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    description TEXT,
    price REAL NOT NULL,
    sale_price REAL,
    sku TEXT UNIQUE,
    stock_quantity INTEGER NOT NULL DEFAULT 0,
    main_image TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_featured INTEGER NOT NULL DEFAULT 0,
    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT
)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let db = Database::connect("sqlite::memory:").await?;
    db.execute(&Statement::new(PRODUCTS_DDL)).await?;

    let product = Product::create(
        &db,
        to_attributes(json!({
            "name": "Walnut desk",
            "slug": "walnut-desk",
            "price": 1249.0,
            "sku": "DESK-01",
            "stock_quantity": 3,
            "is_featured": true,
        }))?,
    )
    .await?;
    let id = product.primary_key().cloned().context("insert returned no key")?;
    info!("Created product {} at {}", id, product.formatted_price());

    let found = Product::find_or_fail(&db, id.clone()).await?;
    info!("Found: {}", found.to_json());

    Product::update(&db, id.clone(), to_attributes(json!({"sale_price": 999.0}))?).await?;
    let discounted = Product::find_or_fail(&db, id.clone()).await?;
    info!(
        "On sale for {} ({}% off)",
        discounted.formatted_price(),
        discounted.get_attribute("discount_percent").unwrap_or_default()
    );

    Product::delete(&db, id.clone()).await?;
    info!(
        "Soft deleted; live rows: {}, trashed rows: {}",
        Product::count(&db).await?,
        Product::query().only_trashed().count(&db).await?
    );

    Product::force_delete(&db, id).await?;
    info!("Force deleted; rows left: {}", Product::query().with_trashed().count(&db).await?);

    let stats = db.stats().await;
    info!("{} statements executed", stats.statements_executed);
    db.close().await?;
    Ok(())
}
