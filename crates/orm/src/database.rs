//! Connection Provider - lazily opened, shared database handle
//!
//! `Database` owns a single physical connection, opened on first use and
//! guarded by an async mutex so statements never run concurrently on it.
//! Every statement is bound through the driver's prepared-statement
//! mechanism; failures are logged with their SQL and (redacted) parameters
//! and then propagated as typed errors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlx::any::{install_default_drivers, AnyQueryResult, AnyRow};
use sqlx::{AnyConnection, Connection};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::backends::{
    decode_column, row_to_attributes, Attributes, DatabaseBackendType, Statement,
};
use crate::config::DatabaseConfig;
use crate::error::{ModelError, ModelResult};
use crate::security;

/// Runs one driver call against the session connection, reconnecting and
/// retrying once when the connection itself failed outside a transaction.
macro_rules! with_retry {
    ($db:expr, $statement:expr, $context:expr, |$conn:ident| $body:expr) => {{
        let mut session = $db.session().await?;
        let first = match session.connection() {
            Ok($conn) => $body.await.map_err(ModelError::from),
            Err(err) => Err(err),
        };
        let outcome = match first {
            Err(err) if err.is_connection_error() && !session.in_transaction => {
                $db.recover(&mut session, &err).await?;
                match session.connection() {
                    Ok($conn) => $body.await.map_err(ModelError::from),
                    Err(err) => Err(err),
                }
            }
            other => other,
        };
        outcome.map_err(|err| $db.fail($context, $statement, err))
    }};
}

/// Connection state guarded by the provider's mutex
pub(crate) struct Session {
    pub(crate) conn: Option<AnyConnection>,
    pub(crate) in_transaction: bool,
    /// Fail the next connection checkout as if the link had dropped
    #[cfg(test)]
    pub(crate) severed: bool,
}

impl Session {
    pub(crate) fn connection(&mut self) -> ModelResult<&mut AnyConnection> {
        #[cfg(test)]
        let severed = std::mem::take(&mut self.severed);
        #[cfg(not(test))]
        let severed = false;
        if severed {
            return Err(ModelError::Connection("Connection reset by peer".to_string()));
        }

        self.conn
            .as_mut()
            .ok_or_else(|| ModelError::Connection("Database connection is not open".to_string()))
    }
}

struct DatabaseInner {
    config: DatabaseConfig,
    backend: DatabaseBackendType,
    session: Mutex<Session>,
    statements: AtomicU64,
    errors: AtomicU64,
    reconnects: AtomicU64,
}

/// Connection provider statistics
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseStats {
    pub connected: bool,
    pub in_transaction: bool,
    pub backend: DatabaseBackendType,
    pub url: String,
    pub statements_executed: u64,
    pub errors: u64,
    pub reconnects: u64,
}

/// Shared handle to one logical database
///
/// Cloning is cheap; all clones share the same underlying connection.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.inner.backend)
            .field("url", &self.inner.config.redacted_url())
            .finish()
    }
}

impl Database {
    /// Create a provider without connecting; the connection opens on first use
    pub fn new(config: DatabaseConfig) -> ModelResult<Self> {
        let backend = config.backend()?;
        Ok(Self {
            inner: Arc::new(DatabaseInner {
                config,
                backend,
                session: Mutex::new(Session {
                    conn: None,
                    in_transaction: false,
                    #[cfg(test)]
                    severed: false,
                }),
                statements: AtomicU64::new(0),
                errors: AtomicU64::new(0),
                reconnects: AtomicU64::new(0),
            }),
        })
    }

    /// Create a provider and open its connection immediately
    pub async fn connect(url: &str) -> ModelResult<Self> {
        let database = Self::new(DatabaseConfig::new(url))?;
        drop(database.session().await?);
        Ok(database)
    }

    /// Backend dialect of this database
    pub fn backend(&self) -> DatabaseBackendType {
        self.inner.backend
    }

    /// Alias of [`Database::backend`]
    pub fn dialect(&self) -> DatabaseBackendType {
        self.inner.backend
    }

    /// Escape `%`, `_` and `\` in a value meant to match literally inside LIKE
    pub fn escape_like(&self, value: &str) -> String {
        security::escape_like(value)
    }

    /// Configuration this provider was built from
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    async fn open(&self) -> ModelResult<AnyConnection> {
        install_default_drivers();
        let config = &self.inner.config;

        match tokio::time::timeout(config.connect_timeout, AnyConnection::connect(&config.url)).await
        {
            Ok(Ok(conn)) => {
                info!("Database connection opened ({})", config.redacted_url());
                Ok(conn)
            }
            Ok(Err(e)) => {
                error!("Failed to connect to {}: {}", config.redacted_url(), e);
                Err(ModelError::Connection(format!(
                    "Failed to connect to {}: {}",
                    config.redacted_url(),
                    e
                )))
            }
            Err(_) => {
                error!(
                    "Connection to {} timed out after {:?}",
                    config.redacted_url(),
                    config.connect_timeout
                );
                Err(ModelError::Connection(format!(
                    "Connection to {} timed out after {}s",
                    config.redacted_url(),
                    config.connect_timeout.as_secs()
                )))
            }
        }
    }

    /// Lock the session, opening the connection if needed
    pub(crate) async fn session(&self) -> ModelResult<MutexGuard<'_, Session>> {
        let mut session = self.inner.session.lock().await;
        if session.conn.is_none() {
            session.conn = Some(self.open().await?);
        }
        Ok(session)
    }

    async fn recover(&self, session: &mut Session, cause: &ModelError) -> ModelResult<()> {
        warn!("Connection lost ({}), reconnecting once", cause);
        self.inner.reconnects.fetch_add(1, Ordering::Relaxed);
        session.conn = None;
        session.conn = Some(self.open().await?);
        Ok(())
    }

    fn log_statement(&self, context: &str, statement: &Statement) {
        self.inner.statements.fetch_add(1, Ordering::Relaxed);
        if self.inner.config.log_statements {
            debug!(
                context,
                sql = %statement.sql,
                params = %statement.params_for_log(),
                "Executing statement"
            );
        }
    }

    fn fail(&self, context: &str, statement: &Statement, err: ModelError) -> ModelError {
        self.inner.errors.fetch_add(1, Ordering::Relaxed);
        error!(
            context,
            sql = %statement.sql,
            params = %statement.params_for_log(),
            "Database statement failed: {}",
            err
        );
        err.with_sql(&statement.sql)
    }

    async fn run(&self, context: &str, statement: &Statement) -> ModelResult<AnyQueryResult> {
        self.log_statement(context, statement);
        with_retry!(self, statement, context, |conn| statement.to_query().execute(conn))
    }

    /// Run a mutating statement and return the number of affected rows
    pub async fn execute(&self, statement: &Statement) -> ModelResult<u64> {
        Ok(self.run("execute", statement).await?.rows_affected())
    }

    /// Run an INSERT and return the key the store assigned to `primary_key`
    pub async fn insert(&self, statement: &Statement, primary_key: &str) -> ModelResult<Option<i64>> {
        if self.backend().supports_returning() {
            let mut returning = statement.clone();
            returning.sql = format!(
                "{} RETURNING {}",
                statement.sql,
                self.backend().quote_identifier(primary_key)
            );
            let row = self.query_optional("insert", &returning).await?;
            return match row {
                Some(row) => Ok(decode_column(&row, 0)?.as_i64()),
                None => Ok(None),
            };
        }

        Ok(self.run("insert", statement).await?.last_insert_id())
    }

    /// Run a read statement and return the raw driver rows
    pub async fn query(&self, statement: &Statement) -> ModelResult<Vec<AnyRow>> {
        self.log_statement("query", statement);
        with_retry!(self, statement, "query", |conn| statement.to_query().fetch_all(conn))
    }

    async fn query_optional(&self, context: &str, statement: &Statement) -> ModelResult<Option<AnyRow>> {
        self.log_statement(context, statement);
        with_retry!(self, statement, context, |conn| statement.to_query().fetch_optional(conn))
    }

    /// Run a read statement and return every row as an attribute map
    pub async fn fetch_all(&self, statement: &Statement) -> ModelResult<Vec<Attributes>> {
        self.query(statement)
            .await?
            .iter()
            .map(row_to_attributes)
            .collect()
    }

    /// Run a read statement and return its first row, if any
    pub async fn fetch_optional(&self, statement: &Statement) -> ModelResult<Option<Attributes>> {
        match self.query_optional("fetch_optional", statement).await? {
            Some(row) => Ok(Some(row_to_attributes(&row)?)),
            None => Ok(None),
        }
    }

    /// Run a read statement that must return at least one row
    pub async fn fetch_one(&self, statement: &Statement) -> ModelResult<Attributes> {
        self.fetch_optional(statement).await?.ok_or_else(|| ModelError::Statement {
            message: "query returned no rows".to_string(),
            sql: statement.sql.clone(),
        })
    }

    /// Run a read statement and return the first column of its first row
    pub async fn fetch_scalar(&self, statement: &Statement) -> ModelResult<Option<JsonValue>> {
        match self.query_optional("fetch_scalar", statement).await? {
            Some(row) => Ok(Some(decode_column(&row, 0)?)),
            None => Ok(None),
        }
    }

    /// Check whether a table exists in the current database
    pub async fn table_exists(&self, table: &str) -> ModelResult<bool> {
        let statement = Statement::new(self.backend().table_exists_sql()).bind(table);
        let count = self.fetch_scalar(&statement).await?;
        Ok(count.and_then(|c| c.as_i64()).unwrap_or(0) > 0)
    }

    /// Ping the connection without opening one
    pub async fn is_connected(&self) -> bool {
        let mut session = self.inner.session.lock().await;
        match session.conn.as_mut() {
            Some(conn) => conn.ping().await.is_ok(),
            None => false,
        }
    }

    /// Drop the current connection and open a fresh one
    pub async fn reconnect(&self) -> ModelResult<()> {
        let mut session = self.inner.session.lock().await;
        if session.in_transaction {
            warn!("Reconnecting inside a transaction; uncommitted work is lost");
        }
        session.conn = None;
        session.in_transaction = false;
        session.conn = Some(self.open().await?);
        self.inner.reconnects.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Close the connection; the next statement reopens it
    pub async fn close(&self) -> ModelResult<()> {
        let mut session = self.inner.session.lock().await;
        session.in_transaction = false;
        if let Some(conn) = session.conn.take() {
            conn.close().await?;
            info!("Database connection closed ({})", self.inner.config.redacted_url());
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn sever(&self) {
        self.inner.session.lock().await.severed = true;
    }

    /// Current provider statistics
    pub async fn stats(&self) -> DatabaseStats {
        let session = self.inner.session.lock().await;
        DatabaseStats {
            connected: session.conn.is_some(),
            in_transaction: session.in_transaction,
            backend: self.inner.backend,
            url: self.inner.config.redacted_url(),
            statements_executed: self.inner.statements.load(Ordering::Relaxed),
            errors: self.inner.errors.load(Ordering::Relaxed),
            reconnects: self.inner.reconnects.load(Ordering::Relaxed),
        }
    }
}
