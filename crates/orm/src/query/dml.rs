//! Statement builders for INSERT, UPDATE and DELETE by primary key

use serde_json::Value;

use super::sql_generation::{bind_value, quoted};
use crate::backends::{Attributes, DatabaseBackendType, Statement};
use crate::error::ModelResult;
use crate::model::{Model, DELETED_AT};

fn is_hidden<M: Model>(column: &str) -> bool {
    M::hidden().contains(&column)
}

/// `INSERT INTO table (...) VALUES (...)` for the given attributes
pub(crate) fn insert<M: Model>(
    backend: DatabaseBackendType,
    attributes: &Attributes,
) -> ModelResult<Statement> {
    let table = quoted(backend, M::table_name())?;
    let mut statement = Statement::new(String::new());

    if attributes.is_empty() {
        statement.sql = match backend {
            DatabaseBackendType::MySQL => format!("INSERT INTO {} () VALUES ()", table),
            _ => format!("INSERT INTO {} DEFAULT VALUES", table),
        };
        return Ok(statement);
    }

    let mut columns = Vec::with_capacity(attributes.len());
    let mut placeholders = Vec::with_capacity(attributes.len());
    for (column, value) in attributes {
        columns.push(quoted(backend, column)?);
        placeholders.push(bind_value(&mut statement, backend, value, is_hidden::<M>(column)));
    }

    statement.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(statement)
}

/// `UPDATE table SET ... WHERE pk = ?`
pub(crate) fn update<M: Model>(
    backend: DatabaseBackendType,
    id: &Value,
    changes: &Attributes,
) -> ModelResult<Statement> {
    let mut statement = Statement::new(String::new());

    let mut assignments = Vec::with_capacity(changes.len());
    for (column, value) in changes {
        let placeholder = bind_value(&mut statement, backend, value, is_hidden::<M>(column));
        assignments.push(format!("{} = {}", quoted(backend, column)?, placeholder));
    }
    let key = bind_value(&mut statement, backend, id, false);

    statement.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(backend, M::table_name())?,
        assignments.join(", "),
        quoted(backend, M::primary_key_name())?,
        key
    );
    Ok(statement)
}

/// `DELETE FROM table WHERE pk = ?`
pub(crate) fn delete<M: Model>(backend: DatabaseBackendType, id: &Value) -> ModelResult<Statement> {
    let mut statement = Statement::new(String::new());
    let key = bind_value(&mut statement, backend, id, false);

    statement.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(backend, M::table_name())?,
        quoted(backend, M::primary_key_name())?,
        key
    );
    Ok(statement)
}

/// Set or clear the tombstone on one live (or trashed) row
pub(crate) fn set_tombstone<M: Model>(
    backend: DatabaseBackendType,
    id: &Value,
    deleted_at: Option<&str>,
) -> ModelResult<Statement> {
    let mut statement = Statement::new(String::new());
    let column = quoted(backend, DELETED_AT)?;

    let value = deleted_at.map(|ts| Value::String(ts.to_string())).unwrap_or(Value::Null);
    let stamp = bind_value(&mut statement, backend, &value, false);
    let key = bind_value(&mut statement, backend, id, false);
    let guard = if deleted_at.is_some() { "IS NULL" } else { "IS NOT NULL" };

    statement.sql = format!(
        "UPDATE {} SET {} = {} WHERE {} = {} AND {} {}",
        quoted(backend, M::table_name())?,
        column,
        stamp,
        quoted(backend, M::primary_key_name())?,
        key,
        column,
        guard
    );
    Ok(statement)
}
