//! # storefront-orm: persistence layer for the storefront
//!
//! A small active-record layer over the sqlx `Any` driver: a lazily opened,
//! shared `Database` handle, a fluent `QueryBuilder` compiled to
//! parameterized statements, and `Record<M>` attribute bags with a fillable
//! policy, dirty tracking and computed attributes.
//!
//! ```no_run
//! use storefront_orm::prelude::*;
//! use storefront_orm::models::Product;
//!
//! # async fn demo() -> ModelResult<()> {
//! let db = Database::new(DatabaseConfig::from_env()?)?;
//! let _featured = Product::query().active().featured().order_by("name").get(&db).await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod models;
pub mod query;
pub mod security;
pub mod transaction;

pub use backends::{to_attributes, Attributes, DatabaseBackendType, DatabaseValue, Statement};
pub use config::{ConfigError, DatabaseConfig};
pub use database::{Database, DatabaseStats};
pub use error::*;
pub use model::*;
pub use query::*;
pub use security::{escape_like, validate_identifier};
pub use transaction::with_transaction;

/// Everything needed to define and query models
pub mod prelude {
    pub use crate::backends::{to_attributes, Attributes, DatabaseBackendType, Statement};
    pub use crate::config::DatabaseConfig;
    pub use crate::database::Database;
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::model::{Accessor, CrudOperations, Model, Record};
    pub use crate::query::{OrderDirection, Paginated, QueryBuilder, QueryOperator};
}
