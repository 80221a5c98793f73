//! Shared fixtures for the integration tests: an in-memory SQLite database
//! with the storefront schema plus a small `Widget` entity.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use storefront_orm::prelude::*;
use tracing_subscriber::EnvFilter;

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        first_name TEXT,
        last_name TEXT,
        role TEXT DEFAULT 'customer'
    )",
    "CREATE TABLE categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        parent_id INTEGER
    )",
    "CREATE TABLE products (
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
    )",
    "CREATE TABLE orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        total REAL NOT NULL,
        shipping_address TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE widgets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        sku TEXT NOT NULL UNIQUE,
        price REAL NOT NULL,
        created_at TEXT,
        updated_at TEXT,
        deleted_at TEXT
    )",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub sku: String,
    pub price: f64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

impl Model for Widget {
    fn table_name() -> &'static str {
        "widgets"
    }

    fn fillable() -> &'static [&'static str] {
        &["name", "price", "sku"]
    }

    fn uses_timestamps() -> bool {
        true
    }

    fn uses_soft_deletes() -> bool {
        true
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh, private in-memory database with the schema applied
pub async fn database() -> Database {
    init_tracing();
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should open");
    for ddl in SCHEMA {
        db.execute(&Statement::new(*ddl))
            .await
            .expect("schema should apply");
    }
    db
}

pub fn attrs(value: serde_json::Value) -> Attributes {
    to_attributes(value).expect("fixture attributes must be an object")
}
