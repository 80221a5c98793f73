//! Error types for the ORM system
//!
//! Provides typed errors for connection handling, statement execution,
//! record lookup, mass assignment and query building.

use std::fmt;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The underlying connection could not be established or was lost
    Connection(String),
    /// A statement was rejected by the store (syntax, constraint violation, ...)
    Statement { message: String, sql: String },
    /// Record not found in the given table
    NotFound(String),
    /// Primary key is missing or invalid
    MissingPrimaryKey,
    /// Attempted bulk assignment of non-fillable fields (strict mode only)
    MassAssignment(Vec<String>),
    /// Transaction boundary misuse or failure
    Transaction(String),
    /// Query building error
    Query(String),
    /// Serialization/deserialization error
    Serialization(String),
    /// Configuration error
    Configuration(String),
    /// Password hashing failed or no password was given
    Hashing(String),
}

impl ModelError {
    /// Attach the statement text to a statement error
    pub fn with_sql(self, sql: &str) -> Self {
        match self {
            ModelError::Statement { message, .. } => ModelError::Statement {
                message,
                sql: sql.to_string(),
            },
            other => other,
        }
    }

    /// Whether this error means the connection itself is unusable
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ModelError::Connection(_))
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ModelError::Statement { message, sql } if sql.is_empty() => {
                write!(f, "Statement error: {}", message)
            }
            ModelError::Statement { message, sql } => {
                write!(f, "Statement error: {} (sql: {})", message, sql)
            }
            ModelError::NotFound(table) => write!(f, "Record not found in table '{}'", table),
            ModelError::MissingPrimaryKey => write!(f, "Primary key is missing or invalid"),
            ModelError::MassAssignment(keys) => {
                write!(f, "Mass assignment rejected for fields: {}", keys.join(", "))
            }
            ModelError::Transaction(msg) => write!(f, "Transaction error: {}", msg),
            ModelError::Query(msg) => write!(f, "Query error: {}", msg),
            ModelError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ModelError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ModelError::Hashing(msg) => write!(f, "Password hashing error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => ModelError::Connection(err.to_string()),
            sqlx::Error::Configuration(_) => ModelError::Configuration(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                ModelError::Serialization(err.to_string())
            }
            _ => ModelError::Statement {
                message: err.to_string(),
                sql: String::new(),
            },
        }
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

/// Error types for query builder operations
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Identifier failed validation
    InvalidIdentifier(String),
    /// Unknown comparison operator
    InvalidOperator(String),
    /// Operator used with the wrong number of values
    InvalidParameter(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidIdentifier(msg) => write!(f, "Invalid identifier: {}", msg),
            QueryError::InvalidOperator(msg) => write!(f, "Invalid operator: {}", msg),
            QueryError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<QueryError> for ModelError {
    fn from(err: QueryError) -> Self {
        ModelError::Query(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_sql_only_touches_statement_errors() {
        let err = ModelError::Statement {
            message: "UNIQUE constraint failed".to_string(),
            sql: String::new(),
        }
        .with_sql("INSERT INTO products (sku) VALUES (?)");

        assert_eq!(
            err.to_string(),
            "Statement error: UNIQUE constraint failed (sql: INSERT INTO products (sku) VALUES (?))"
        );

        let other = ModelError::NotFound("products".to_string()).with_sql("SELECT 1");
        assert_eq!(other, ModelError::NotFound("products".to_string()));
    }

    #[test]
    fn test_sqlx_error_classification() {
        assert!(ModelError::from(sqlx::Error::PoolClosed).is_connection_error());
        assert!(!ModelError::from(sqlx::Error::RowNotFound).is_connection_error());
        assert!(matches!(
            ModelError::from(sqlx::Error::RowNotFound),
            ModelError::Statement { .. }
        ));
    }

    #[test]
    fn test_query_error_conversion() {
        let err: ModelError = QueryError::InvalidOperator("<=>".to_string()).into();
        assert_eq!(err, ModelError::Query("Invalid operator: <=>".to_string()));
    }

    #[test]
    fn test_mass_assignment_display() {
        let err = ModelError::MassAssignment(vec!["id".to_string(), "role".to_string()]);
        assert_eq!(err.to_string(), "Mass assignment rejected for fields: id, role");
    }
}
