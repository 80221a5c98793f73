//! Product category, optionally nested under a parent

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::product::Product;
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::model::{CrudOperations, Model, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl Model for Category {
    fn table_name() -> &'static str {
        "categories"
    }

    fn fillable() -> &'static [&'static str] {
        &["name", "slug", "description", "parent_id"]
    }
}

impl Category {
    pub async fn find_by_slug(db: &Database, slug: &str) -> ModelResult<Option<Record<Category>>> {
        Category::find_by(db, "slug", slug).await
    }
}

impl Record<Category> {
    fn id(&self) -> ModelResult<Value> {
        self.primary_key().cloned().ok_or(ModelError::MissingPrimaryKey)
    }

    /// Direct subcategories
    pub async fn children(&self, db: &Database) -> ModelResult<Vec<Record<Category>>> {
        Category::find_all_by(db, "parent_id", self.id()?).await
    }

    /// Live products filed under this category
    pub async fn products(&self, db: &Database) -> ModelResult<Vec<Record<Product>>> {
        Product::find_all_by(db, "category_id", self.id()?).await
    }
}
