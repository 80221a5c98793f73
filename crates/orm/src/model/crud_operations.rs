//! CRUD Operations - table-level Create, Read, Update, Delete for models
//!
//! Every `Model` gets these through the blanket impl below. Reads honor the
//! soft-delete scope; writes apply the fillable policy and timestamps.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use super::core_trait::{Model, UPDATED_AT};
use super::fillable::FillablePolicy;
use super::record::Record;
use crate::backends::{format_timestamp, Attributes};
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::query::{dml, Paginated, QueryBuilder};

/// Trait providing CRUD operations for models
pub trait CrudOperations: Model {
    /// Start a query against this model's table
    fn query() -> QueryBuilder<Self> {
        QueryBuilder::new()
    }

    /// Find a live record by its primary key
    async fn find<T: Into<Value>>(db: &Database, id: T) -> ModelResult<Option<Record<Self>>> {
        Self::query()
            .where_eq(Self::primary_key_name(), id)
            .first(db)
            .await
    }

    /// Find a live record by its primary key or return an error if not found
    async fn find_or_fail<T: Into<Value>>(db: &Database, id: T) -> ModelResult<Record<Self>> {
        let id = id.into();
        Self::find(db, id.clone())
            .await?
            .ok_or_else(|| ModelError::NotFound(format!("{}({})", Self::table_name(), id)))
    }

    /// Find a record by primary key, soft-deleted or not
    async fn find_with_trashed<T: Into<Value>>(db: &Database, id: T) -> ModelResult<Option<Record<Self>>> {
        Self::query()
            .with_trashed()
            .where_eq(Self::primary_key_name(), id)
            .first(db)
            .await
    }

    /// First live record whose `column` equals `value`
    async fn find_by<T: Into<Value>>(db: &Database, column: &str, value: T) -> ModelResult<Option<Record<Self>>> {
        Self::query().where_eq(column, value).first(db).await
    }

    /// Every live record whose `column` equals `value`
    async fn find_all_by<T: Into<Value>>(db: &Database, column: &str, value: T) -> ModelResult<Vec<Record<Self>>> {
        Self::query().where_eq(column, value).get(db).await
    }

    /// Every live record
    async fn all(db: &Database) -> ModelResult<Vec<Record<Self>>> {
        Self::query().get(db).await
    }

    /// Number of live records
    async fn count(db: &Database) -> ModelResult<i64> {
        Self::query().count(db).await
    }

    /// One page of live records
    async fn paginate(db: &Database, page: u64, per_page: u64) -> ModelResult<Paginated<Self>> {
        Self::query().paginate(db, page, per_page).await
    }

    /// Insert a record built from the fillable subset of `data`
    async fn create(db: &Database, data: Attributes) -> ModelResult<Record<Self>> {
        let mut record = Record::<Self>::from_attributes(data);
        record.save(db).await?;
        Ok(record)
    }

    /// Update the fillable subset of `data` on the row with this key
    ///
    /// Returns `false` when no row matched or nothing fillable was given.
    async fn update<T: Into<Value>>(db: &Database, id: T, data: Attributes) -> ModelResult<bool> {
        let (mut changes, rejected) = FillablePolicy::of::<Self>().partition(data);
        if !rejected.is_empty() {
            debug!(
                "Dropped non-fillable attributes for {}: {}",
                Self::table_name(),
                rejected.join(", ")
            );
        }
        if changes.is_empty() {
            return Ok(false);
        }
        if Self::uses_timestamps() {
            changes.insert(
                UPDATED_AT.to_string(),
                Value::String(format_timestamp(Utc::now())),
            );
        }

        let statement = dml::update::<Self>(db.backend(), &id.into(), &changes)?;
        Ok(db.execute(&statement).await? > 0)
    }

    /// Delete by key: soft when the model uses soft deletes, physical otherwise
    async fn delete<T: Into<Value>>(db: &Database, id: T) -> ModelResult<bool> {
        let id = id.into();
        let statement = if Self::uses_soft_deletes() {
            let now = format_timestamp(Utc::now());
            dml::set_tombstone::<Self>(db.backend(), &id, Some(&now))?
        } else {
            dml::delete::<Self>(db.backend(), &id)?
        };
        Ok(db.execute(&statement).await? > 0)
    }

    /// Physically delete by key, trashed or not
    async fn force_delete<T: Into<Value>>(db: &Database, id: T) -> ModelResult<bool> {
        let statement = dml::delete::<Self>(db.backend(), &id.into())?;
        Ok(db.execute(&statement).await? > 0)
    }

    /// Clear the tombstone on a soft-deleted row
    async fn restore<T: Into<Value>>(db: &Database, id: T) -> ModelResult<bool> {
        if !Self::uses_soft_deletes() {
            return Ok(false);
        }
        let statement = dml::set_tombstone::<Self>(db.backend(), &id.into(), None)?;
        Ok(db.execute(&statement).await? > 0)
    }
}

impl<T: Model> CrudOperations for T {}
