//! Catalog product

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::category::Category;
use super::flag;
use crate::database::Database;
use crate::error::ModelResult;
use crate::model::{Accessor, CrudOperations, Model, Record};
use crate::query::QueryBuilder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub main_image: Option<String>,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub is_featured: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

const PRODUCT_ACCESSORS: &[Accessor<Product>] = &[
    Accessor {
        name: "final_price",
        derive: final_price,
    },
    Accessor {
        name: "discount_percent",
        derive: discount_percent,
    },
];

impl Model for Product {
    fn table_name() -> &'static str {
        "products"
    }

    fn fillable() -> &'static [&'static str] {
        &[
            "category_id",
            "name",
            "slug",
            "description",
            "price",
            "sale_price",
            "sku",
            "stock_quantity",
            "main_image",
            "is_active",
            "is_featured",
        ]
    }

    fn guarded() -> &'static [&'static str] {
        &["id", "created_at", "updated_at"]
    }

    fn uses_timestamps() -> bool {
        true
    }

    fn uses_soft_deletes() -> bool {
        true
    }

    fn accessors() -> &'static [Accessor<Self>] {
        PRODUCT_ACCESSORS
    }
}

fn number(record: &Record<Product>, key: &str) -> Option<f64> {
    record.get(key).and_then(Value::as_f64)
}

/// Sale price when set, list price otherwise
fn final_price(record: &Record<Product>) -> Option<Value> {
    number(record, "sale_price")
        .or_else(|| number(record, "price"))
        .map(Value::from)
}

/// Whole-number percentage the sale price takes off the list price
fn discount_percent(record: &Record<Product>) -> Option<Value> {
    let percent = match (number(record, "price"), number(record, "sale_price")) {
        (Some(price), Some(sale)) if price > 0.0 && sale != 0.0 => {
            ((price - sale) / price * 100.0).round() as i64
        }
        _ => 0,
    };
    Some(Value::from(percent))
}

impl QueryBuilder<Product> {
    /// Products visible in the storefront
    pub fn active(self) -> Self {
        self.where_eq("is_active", 1)
    }

    /// Products flagged for the home page
    pub fn featured(self) -> Self {
        self.where_eq("is_featured", 1)
    }
}

impl Record<Product> {
    pub fn in_stock(&self) -> bool {
        self.get("stock_quantity")
            .and_then(Value::as_i64)
            .map_or(false, |qty| qty > 0)
    }

    /// Final price rendered as `1 234,50 €`
    pub fn formatted_price(&self) -> String {
        let price = self
            .get_attribute("final_price")
            .and_then(|v| v.as_f64())
            .unwrap_or_default();
        let fixed = format!("{:.2}", price.abs());
        let (units, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

        let mut grouped = String::new();
        for (i, digit) in units.chars().enumerate() {
            if i > 0 && (units.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(digit);
        }
        let sign = if price < 0.0 { "-" } else { "" };
        format!("{}{},{} €", sign, grouped, cents)
    }

    /// The category this product belongs to
    pub async fn category(&self, db: &Database) -> ModelResult<Option<Record<Category>>> {
        match self.get("category_id").filter(|id| !id.is_null()) {
            Some(id) => Category::find(db, id.clone()).await,
            None => Ok(None),
        }
    }
}
