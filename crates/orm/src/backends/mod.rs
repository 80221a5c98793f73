//! Database Backend Abstractions
//!
//! The ORM talks to every store through the sqlx `Any` driver. This module
//! holds what still differs between backends: placeholder syntax, identifier
//! quoting, LIMIT/OFFSET rendering and catalog queries.

use url::Url;

pub mod core;

pub use core::*;

/// Database backend type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::PostgreSQL => write!(f, "postgresql"),
            DatabaseBackendType::MySQL => write!(f, "mysql"),
            DatabaseBackendType::SQLite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pgsql" => Ok(DatabaseBackendType::PostgreSQL),
            "mysql" | "mariadb" => Ok(DatabaseBackendType::MySQL),
            "sqlite" => Ok(DatabaseBackendType::SQLite),
            _ => Err(format!("Unsupported database backend: {}", s)),
        }
    }
}

impl DatabaseBackendType {
    /// Detect the backend from a connection URL scheme (`sqlite::memory:`,
    /// `postgres://...`, `mysql://...`)
    pub fn from_url(url: &str) -> Result<Self, String> {
        let parsed = Url::parse(url).map_err(|e| format!("Invalid database URL: {}", e))?;
        parsed.scheme().parse()
    }

    /// Placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            DatabaseBackendType::PostgreSQL => format!("${}", index),
            DatabaseBackendType::MySQL | DatabaseBackendType::SQLite => "?".to_string(),
        }
    }

    /// Quote an already validated identifier, keeping `table.column` qualifiers
    pub fn quote_identifier(&self, identifier: &str) -> String {
        identifier
            .split('.')
            .map(|part| match self {
                DatabaseBackendType::MySQL => format!("`{}`", part.replace('`', "``")),
                _ => format!("\"{}\"", part.replace('"', "\"\"")),
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Render LIMIT/OFFSET. SQLite and MySQL need a LIMIT whenever an OFFSET is present.
    pub fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let offset = offset.filter(|o| *o > 0);
        match (limit, offset) {
            (Some(limit), Some(offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => format!(" LIMIT {}", limit),
            (None, Some(offset)) => match self {
                DatabaseBackendType::PostgreSQL => format!(" OFFSET {}", offset),
                DatabaseBackendType::SQLite => format!(" LIMIT -1 OFFSET {}", offset),
                DatabaseBackendType::MySQL => {
                    format!(" LIMIT 18446744073709551615 OFFSET {}", offset)
                }
            },
            (None, None) => String::new(),
        }
    }

    /// Whether INSERT can hand back the generated key with `RETURNING`
    ///
    /// SQLite has it since 3.35; the `Any` driver does not report its
    /// last-insert rowid, so SQLite must use it.
    pub fn supports_returning(&self) -> bool {
        matches!(self, DatabaseBackendType::PostgreSQL | DatabaseBackendType::SQLite)
    }

    /// Catalog query checking for a table; binds the table name as its only parameter
    pub fn table_exists_sql(&self) -> &'static str {
        match self {
            DatabaseBackendType::PostgreSQL => {
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = $1"
            }
            DatabaseBackendType::MySQL => {
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?"
            }
            DatabaseBackendType::SQLite => {
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?"
            }
        }
    }
}
