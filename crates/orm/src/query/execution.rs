//! Query Builder execution for Model types

use tracing::debug;

use super::builder::QueryBuilder;
use super::pagination::{PageWindow, Paginated};
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::model::{Model, Record};

impl<M: Model> QueryBuilder<M> {
    /// Execute query and return hydrated records
    pub async fn get(self, db: &Database) -> ModelResult<Vec<Record<M>>> {
        let statement = self.to_statement(db.backend())?;
        let rows = db.fetch_all(&statement).await?;
        debug!("Loaded {} row(s) from {}", rows.len(), M::table_name());
        Ok(rows.into_iter().map(Record::hydrate).collect())
    }

    /// Execute query and return the first record, if any
    pub async fn first(self, db: &Database) -> ModelResult<Option<Record<M>>> {
        Ok(self.limit(1).get(db).await?.into_iter().next())
    }

    /// Execute query and return the first record or `NotFound`
    pub async fn first_or_fail(self, db: &Database) -> ModelResult<Record<M>> {
        self.first(db)
            .await?
            .ok_or_else(|| ModelError::NotFound(M::table_name().to_string()))
    }

    /// Count matching rows
    pub async fn count(self, db: &Database) -> ModelResult<i64> {
        let statement = self.to_count_statement(db.backend())?;
        let count = db.fetch_scalar(&statement).await?;
        Ok(count.and_then(|value| value.as_i64()).unwrap_or(0))
    }

    /// Execute one page of the query together with the total row count
    pub async fn paginate(self, db: &Database, page: u64, per_page: u64) -> ModelResult<Paginated<M>> {
        let total = self.clone().count(db).await?;
        let window = PageWindow::compute(page, per_page, u64::try_from(total).unwrap_or(0));

        let data = self
            .limit(window.per_page)
            .offset(window.offset)
            .get(db)
            .await?;

        Ok(Paginated::new(data, window))
    }
}
