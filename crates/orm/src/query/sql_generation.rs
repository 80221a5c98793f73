//! Query Builder SQL generation
//!
//! Compiles builder state into a `Statement`. Values are always bound; only
//! validated, quoted identifiers, integer LIMIT/OFFSET literals and the `NULL`
//! keyword are ever written into the SQL text.

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::{DatabaseBackendType, DatabaseValue, Statement};
use crate::error::{ModelResult, QueryError};
use crate::model::{Model, DELETED_AT};
use crate::security::validate_identifier;

/// Validate then quote an identifier for `backend`
pub(crate) fn quoted(backend: DatabaseBackendType, identifier: &str) -> Result<String, QueryError> {
    validate_identifier(identifier)?;
    Ok(backend.quote_identifier(identifier))
}

/// Bind `value` and return the placeholder that refers to it
///
/// A JSON null is rendered as the `NULL` keyword instead of a parameter, so
/// the store types it from the column.
pub(crate) fn bind_value(
    statement: &mut Statement,
    backend: DatabaseBackendType,
    value: &Value,
    redact: bool,
) -> String {
    if value.is_null() {
        return "NULL".to_string();
    }
    statement.push(DatabaseValue::from(value), redact);
    backend.placeholder(statement.params.len())
}

impl<M: Model> QueryBuilder<M> {
    /// Compile to a SELECT statement for `backend`
    pub fn to_statement(&self, backend: DatabaseBackendType) -> ModelResult<Statement> {
        self.check_deferred()?;
        let mut statement = Statement::new(String::new());

        let projection = if self.select_fields.is_empty() {
            "*".to_string()
        } else {
            // Hydrated records must carry their key
            let key = M::primary_key_name();
            let has_key = self.select_fields.iter().any(|field| {
                field == "*" || field == key || field.rsplit('.').next() == Some(key)
            });
            let key_field = (!has_key).then(|| key.to_string());

            key_field
                .iter()
                .chain(self.select_fields.iter())
                .map(|field| {
                    if field == "*" {
                        Ok(field.clone())
                    } else {
                        quoted(backend, field)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?
                .join(", ")
        };

        let mut sql = format!(
            "SELECT {} FROM {}",
            projection,
            quoted(backend, M::table_name())?
        );
        sql.push_str(&self.build_where_clause(backend, &mut statement)?);
        sql.push_str(&self.build_order_clause(backend)?);
        sql.push_str(&backend.limit_clause(self.limit_count, self.offset_value));

        statement.sql = sql;
        Ok(statement)
    }

    /// Compile to a COUNT(*) statement; sort, projection and limits are ignored
    pub fn to_count_statement(&self, backend: DatabaseBackendType) -> ModelResult<Statement> {
        self.check_deferred()?;
        let mut statement = Statement::new(String::new());

        let mut sql = format!(
            "SELECT COUNT(*) AS aggregate FROM {}",
            quoted(backend, M::table_name())?
        );
        sql.push_str(&self.build_where_clause(backend, &mut statement)?);

        statement.sql = sql;
        Ok(statement)
    }

    fn check_deferred(&self) -> Result<(), QueryError> {
        match &self.deferred_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn soft_delete_predicate(&self, backend: DatabaseBackendType) -> Option<String> {
        if !M::uses_soft_deletes() {
            return None;
        }
        let column = backend.quote_identifier(DELETED_AT);
        match self.soft_delete_scope {
            SoftDeleteScope::Exclude => Some(format!("{} IS NULL", column)),
            SoftDeleteScope::Only => Some(format!("{} IS NOT NULL", column)),
            SoftDeleteScope::Include => None,
        }
    }

    /// Build ` WHERE ...`, or an empty string when nothing filters
    fn build_where_clause(
        &self,
        backend: DatabaseBackendType,
        statement: &mut Statement,
    ) -> ModelResult<String> {
        let scope = self.soft_delete_predicate(backend);

        let mut filters = String::new();
        for (i, condition) in self.where_conditions.iter().enumerate() {
            if i > 0 {
                filters.push_str(&format!(" {} ", condition.conjunction));
            }
            filters.push_str(&self.build_condition(backend, condition, statement)?);
        }

        let clause = match (scope, filters.is_empty()) {
            (None, true) => return Ok(String::new()),
            (Some(scope), true) => scope,
            (None, false) => filters,
            (Some(scope), false) => format!("{} AND ({})", scope, filters),
        };
        Ok(format!(" WHERE {}", clause))
    }

    fn build_condition(
        &self,
        backend: DatabaseBackendType,
        condition: &WhereCondition,
        statement: &mut Statement,
    ) -> ModelResult<String> {
        let column = quoted(backend, &condition.column)?;
        let redact = M::hidden().contains(&condition.column.as_str());
        let values = &condition.values;

        let single = || -> Result<&Value, QueryError> {
            match values.as_slice() {
                [value] => Ok(value),
                _ => Err(QueryError::InvalidParameter(format!(
                    "{} on '{}' takes exactly one value, got {}",
                    condition.operator,
                    condition.column,
                    values.len()
                ))),
            }
        };

        let sql = match condition.operator {
            QueryOperator::Equal if single()?.is_null() => format!("{} IS NULL", column),
            QueryOperator::NotEqual if single()?.is_null() => format!("{} IS NOT NULL", column),
            QueryOperator::Equal
            | QueryOperator::NotEqual
            | QueryOperator::GreaterThan
            | QueryOperator::GreaterThanOrEqual
            | QueryOperator::LessThan
            | QueryOperator::LessThanOrEqual => {
                let placeholder = bind_value(statement, backend, single()?, redact);
                format!("{} {} {}", column, condition.operator, placeholder)
            }
            QueryOperator::Like | QueryOperator::NotLike => {
                let placeholder = bind_value(statement, backend, single()?, redact);
                let escape = match backend {
                    DatabaseBackendType::SQLite => " ESCAPE '\\'",
                    _ => "",
                };
                format!("{} {} {}{}", column, condition.operator, placeholder, escape)
            }
            QueryOperator::In if values.is_empty() => "1 = 0".to_string(),
            QueryOperator::NotIn if values.is_empty() => "1 = 1".to_string(),
            QueryOperator::In | QueryOperator::NotIn => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| bind_value(statement, backend, value, redact))
                    .collect();
                format!("{} {} ({})", column, condition.operator, placeholders.join(", "))
            }
            QueryOperator::IsNull | QueryOperator::IsNotNull => {
                format!("{} {}", column, condition.operator)
            }
            QueryOperator::Between => match values.as_slice() {
                [low, high] => {
                    let low = bind_value(statement, backend, low, redact);
                    let high = bind_value(statement, backend, high, redact);
                    format!("{} BETWEEN {} AND {}", column, low, high)
                }
                _ => {
                    return Err(QueryError::InvalidParameter(format!(
                        "BETWEEN on '{}' takes exactly two values, got {}",
                        condition.column,
                        values.len()
                    ))
                    .into())
                }
            },
        };

        Ok(sql)
    }

    fn build_order_clause(&self, backend: DatabaseBackendType) -> ModelResult<String> {
        if self.order_by.is_empty() {
            return Ok(String::new());
        }
        let keys = self
            .order_by
            .iter()
            .map(|(column, direction)| -> ModelResult<String> {
                Ok(format!("{} {}", quoted(backend, column)?, direction))
            })
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(format!(" ORDER BY {}", keys.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use serde_json::json;

    #[derive(Debug)]
    struct Gadget;

    impl Model for Gadget {
        fn table_name() -> &'static str {
            "gadgets"
        }
    }

    #[derive(Debug)]
    struct Account;

    impl Model for Account {
        fn table_name() -> &'static str {
            "accounts"
        }

        fn hidden() -> &'static [&'static str] {
            &["password"]
        }

        fn uses_soft_deletes() -> bool {
            true
        }
    }

    const SQLITE: DatabaseBackendType = DatabaseBackendType::SQLite;

    #[test]
    fn test_plain_select() {
        let statement = QueryBuilder::<Gadget>::new().to_statement(SQLITE).unwrap();
        assert_eq!(statement.sql, "SELECT * FROM \"gadgets\"");
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_filters_sort_and_limits() {
        let statement = QueryBuilder::<Gadget>::new()
            .select(&["id", "name"])
            .where_eq("color", "red")
            .where_gt("weight", 2.5)
            .or_where_eq("featured", true)
            .order_by_desc("weight")
            .order_by("name")
            .limit(10)
            .offset(20)
            .to_statement(SQLITE)
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT \"id\", \"name\" FROM \"gadgets\" WHERE \"color\" = ? AND \"weight\" > ? OR \"featured\" = ? \
             ORDER BY \"weight\" DESC, \"name\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            statement.params,
            vec![
                DatabaseValue::String("red".to_string()),
                DatabaseValue::Float64(2.5),
                DatabaseValue::Bool(true),
            ]
        );
    }

    #[test]
    fn test_postgres_numbered_placeholders() {
        let statement = QueryBuilder::<Gadget>::new()
            .where_in("id", [1, 2])
            .where_between("weight", 1, 5)
            .to_statement(DatabaseBackendType::PostgreSQL)
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT * FROM \"gadgets\" WHERE \"id\" IN ($1, $2) AND \"weight\" BETWEEN $3 AND $4"
        );
    }

    #[test]
    fn test_mysql_quoting() {
        let statement = QueryBuilder::<Gadget>::new()
            .where_like("name", "%bolt%")
            .to_statement(DatabaseBackendType::MySQL)
            .unwrap();
        assert_eq!(statement.sql, "SELECT * FROM `gadgets` WHERE `name` LIKE ?");
    }

    #[test]
    fn test_sqlite_like_declares_escape() {
        let statement = QueryBuilder::<Gadget>::new()
            .where_not_like("name", "50\\%%")
            .to_statement(SQLITE)
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM \"gadgets\" WHERE \"name\" NOT LIKE ? ESCAPE '\\'"
        );
    }

    #[test]
    fn test_null_equality_compiles_to_is_null() {
        let statement = QueryBuilder::<Gadget>::new()
            .where_eq("color", Value::Null)
            .where_ne("size", Value::Null)
            .where_not_null("name")
            .to_statement(SQLITE)
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT * FROM \"gadgets\" WHERE \"color\" IS NULL AND \"size\" IS NOT NULL AND \"name\" IS NOT NULL"
        );
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_empty_in_lists() {
        let none: Vec<i64> = Vec::new();
        let statement = QueryBuilder::<Gadget>::new()
            .where_in("id", none.clone())
            .or_where("id", "NOT IN", json!([]))
            .to_statement(SQLITE)
            .unwrap();
        assert_eq!(statement.sql, "SELECT * FROM \"gadgets\" WHERE 1 = 0 OR 1 = 1");
    }

    #[test]
    fn test_soft_delete_scope_wraps_user_filters() {
        let statement = QueryBuilder::<Account>::new()
            .where_eq("role", "admin")
            .or_where_eq("role", "owner")
            .to_statement(SQLITE)
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM \"accounts\" WHERE \"deleted_at\" IS NULL AND (\"role\" = ? OR \"role\" = ?)"
        );

        let trashed = QueryBuilder::<Account>::new().only_trashed().to_statement(SQLITE).unwrap();
        assert_eq!(trashed.sql, "SELECT * FROM \"accounts\" WHERE \"deleted_at\" IS NOT NULL");

        let all = QueryBuilder::<Account>::new().with_trashed().to_statement(SQLITE).unwrap();
        assert_eq!(all.sql, "SELECT * FROM \"accounts\"");
    }

    #[test]
    fn test_projection_always_includes_primary_key() {
        let statement = QueryBuilder::<Gadget>::new()
            .select(&["name", "color"])
            .to_statement(SQLITE)
            .unwrap();
        assert_eq!(statement.sql, "SELECT \"id\", \"name\", \"color\" FROM \"gadgets\"");

        let qualified = QueryBuilder::<Gadget>::new()
            .select(&["gadgets.id", "name"])
            .to_statement(SQLITE)
            .unwrap();
        assert_eq!(qualified.sql, "SELECT \"gadgets\".\"id\", \"name\" FROM \"gadgets\"");
    }

    #[test]
    fn test_count_ignores_sort_projection_and_limits() {
        let statement = QueryBuilder::<Account>::new()
            .select(&["id"])
            .where_gte("age", 18)
            .order_by("age")
            .limit(5)
            .to_count_statement(SQLITE)
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) AS aggregate FROM \"accounts\" WHERE \"deleted_at\" IS NULL AND (\"age\" >= ?)"
        );
    }

    #[test]
    fn test_hidden_columns_are_redacted() {
        let statement = QueryBuilder::<Account>::new()
            .where_eq("email", "ada@example.com")
            .where_eq("password", "hunter2")
            .to_statement(SQLITE)
            .unwrap();
        assert_eq!(statement.params_for_log(), "['ada@example.com', <redacted>]");
    }

    #[test]
    fn test_invalid_input_is_reported() {
        let err = QueryBuilder::<Gadget>::new()
            .where_eq("name; DROP TABLE gadgets", 1)
            .to_statement(SQLITE)
            .unwrap_err();
        assert!(matches!(err, ModelError::Query(_)));

        let err = QueryBuilder::<Gadget>::new()
            .where_op("weight", "<=>", 1)
            .to_statement(SQLITE)
            .unwrap_err();
        assert_eq!(err, ModelError::Query("Invalid operator: <=>".to_string()));

        let err = QueryBuilder::<Gadget>::new()
            .where_op("weight", "BETWEEN", json!([1]))
            .to_statement(SQLITE)
            .unwrap_err();
        assert!(matches!(err, ModelError::Query(msg) if msg.contains("two values")));
    }
}
