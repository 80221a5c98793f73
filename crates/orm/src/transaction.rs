//! Transaction Management
//!
//! Transactions run on the provider's single connection. Only one level is
//! supported: beginning while a transaction is already active is an error, as
//! is committing or rolling back when none is.

use std::future::Future;

use sqlx::{Any, Database as SqlxDatabase, TransactionManager};
use tracing::{debug, error, warn};

use crate::database::Database;
use crate::error::{ModelError, ModelResult};

type AnyTransactionManager = <Any as SqlxDatabase>::TransactionManager;

impl Database {
    /// Open a transaction on the shared connection
    pub async fn begin_transaction(&self) -> ModelResult<()> {
        let mut session = self.session().await?;
        if session.in_transaction {
            return Err(ModelError::Transaction(
                "A transaction is already active; nested transactions are not supported".to_string(),
            ));
        }

        AnyTransactionManager::begin(session.connection()?)
            .await
            .map_err(|e| {
                error!("Failed to begin transaction: {}", e);
                ModelError::Transaction(format!("Failed to begin transaction: {}", e))
            })?;
        session.in_transaction = true;
        debug!("Transaction started");
        Ok(())
    }

    /// Make the active transaction's changes durable
    pub async fn commit(&self) -> ModelResult<()> {
        let mut session = self.session().await?;
        if !session.in_transaction {
            return Err(ModelError::Transaction("No active transaction to commit".to_string()));
        }

        let result = AnyTransactionManager::commit(session.connection()?).await;
        session.in_transaction = false;
        result.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ModelError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;
        debug!("Transaction committed");
        Ok(())
    }

    /// Discard the active transaction's changes
    pub async fn rollback(&self) -> ModelResult<()> {
        let mut session = self.session().await?;
        if !session.in_transaction {
            return Err(ModelError::Transaction("No active transaction to roll back".to_string()));
        }

        let result = AnyTransactionManager::rollback(session.connection()?).await;
        session.in_transaction = false;
        result.map_err(|e| {
            error!("Failed to roll back transaction: {}", e);
            ModelError::Transaction(format!("Failed to roll back transaction: {}", e))
        })?;
        debug!("Transaction rolled back");
        Ok(())
    }

    /// Whether a transaction is currently open
    pub async fn in_transaction(&self) -> bool {
        self.session()
            .await
            .map(|session| session.in_transaction)
            .unwrap_or(false)
    }

    /// Run `f` inside a transaction
    ///
    /// Commits and returns the closure's value when it succeeds. When it
    /// fails the transaction is rolled back and the original error returned;
    /// a rollback failure is logged but never replaces that error.
    pub async fn run_in_transaction<F, Fut, R>(&self, f: F) -> ModelResult<R>
    where
        F: FnOnce(Database) -> Fut,
        Fut: Future<Output = ModelResult<R>>,
    {
        self.begin_transaction().await?;

        match f(self.clone()).await {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                warn!("Transaction body failed, rolling back: {}", err);
                if let Err(rollback_err) = self.rollback().await {
                    error!("Rollback after failure also failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}

/// Execute a closure within a transaction scope with automatic commit/rollback
pub async fn with_transaction<F, Fut, R>(database: &Database, f: F) -> ModelResult<R>
where
    F: FnOnce(Database) -> Fut,
    Fut: Future<Output = ModelResult<R>>,
{
    database.run_in_transaction(f).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Statement;

    async fn ledger() -> Database {
        let database = Database::connect("sqlite::memory:").await.unwrap();
        database
            .execute(&Statement::new(
                "CREATE TABLE ledger (id INTEGER PRIMARY KEY AUTOINCREMENT, amount INTEGER NOT NULL)",
            ))
            .await
            .unwrap();
        database
    }

    async fn count(database: &Database) -> i64 {
        database
            .fetch_scalar(&Statement::new("SELECT COUNT(*) FROM ledger"))
            .await
            .unwrap()
            .and_then(|v| v.as_i64())
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_and_rollback() {
        let database = ledger().await;

        database.begin_transaction().await.unwrap();
        assert!(database.in_transaction().await);
        database
            .execute(&Statement::new("INSERT INTO ledger (amount) VALUES (?)").bind(10))
            .await
            .unwrap();
        database.rollback().await.unwrap();
        assert!(!database.in_transaction().await);
        assert_eq!(count(&database).await, 0);

        database.begin_transaction().await.unwrap();
        database
            .execute(&Statement::new("INSERT INTO ledger (amount) VALUES (?)").bind(10))
            .await
            .unwrap();
        database.commit().await.unwrap();
        assert_eq!(count(&database).await, 1);
    }

    #[tokio::test]
    async fn test_nesting_and_stray_boundaries_are_errors() {
        let database = ledger().await;

        assert!(matches!(database.commit().await, Err(ModelError::Transaction(_))));
        assert!(matches!(database.rollback().await, Err(ModelError::Transaction(_))));

        database.begin_transaction().await.unwrap();
        assert!(matches!(
            database.begin_transaction().await,
            Err(ModelError::Transaction(_))
        ));
        database.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_with_transaction_rolls_back_and_returns_original_error() {
        let database = ledger().await;

        let result: ModelResult<()> = with_transaction(&database, |db| async move {
            db.execute(&Statement::new("INSERT INTO ledger (amount) VALUES (?)").bind(5))
                .await?;
            Err(ModelError::Query("boom".to_string()))
        })
        .await;

        assert_eq!(result, Err(ModelError::Query("boom".to_string())));
        assert_eq!(count(&database).await, 0);
        assert!(!database.in_transaction().await);

        let inserted = database
            .run_in_transaction(|db| async move {
                db.execute(&Statement::new("INSERT INTO ledger (amount) VALUES (?)").bind(7))
                    .await
            })
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(count(&database).await, 1);
    }
}
