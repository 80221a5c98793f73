//! Customer order

use serde::{Deserialize, Serialize};

use super::user::User;
use crate::database::Database;
use crate::error::ModelResult;
use crate::model::{CrudOperations, Model, Record};
use crate::query::QueryBuilder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: i64,
    pub status: String,
    pub total: f64,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Model for Order {
    fn table_name() -> &'static str {
        "orders"
    }

    fn fillable() -> &'static [&'static str] {
        &["user_id", "status", "total", "shipping_address"]
    }

    fn uses_timestamps() -> bool {
        true
    }
}

impl QueryBuilder<Order> {
    pub fn with_status(self, status: &str) -> Self {
        self.where_eq("status", status)
    }
}

impl Record<Order> {
    /// The customer who placed the order
    pub async fn user(&self, db: &Database) -> ModelResult<Option<Record<User>>> {
        match self.get("user_id").filter(|id| !id.is_null()) {
            Some(id) => User::find(db, id.clone()).await,
            None => Ok(None),
        }
    }
}
