//! Query Builder WHERE clause operations

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;

impl<M> QueryBuilder<M> {
    fn push_condition(
        mut self,
        conjunction: Conjunction,
        column: &str,
        operator: QueryOperator,
        values: Vec<Value>,
    ) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator,
            values,
            conjunction,
        });
        self
    }

    fn push_parsed(self, conjunction: Conjunction, column: &str, operator: &str, value: Value) -> Self {
        match operator.parse::<QueryOperator>() {
            Ok(op) => {
                let values = match (op, value) {
                    (op, _) if op.is_unary() => Vec::new(),
                    (op, Value::Array(items)) if op.is_list() => items,
                    (_, value) => vec![value],
                };
                self.push_condition(conjunction, column, op, values)
            }
            Err(err) => {
                let mut builder = self;
                builder.defer_error(err);
                builder
            }
        }
    }

    /// Add WHERE condition with equality
    pub fn where_eq<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_condition(Conjunction::And, column, QueryOperator::Equal, vec![value.into()])
    }

    /// Add WHERE condition with an operator given as text (`"="`, `">="`, `"LIKE"`, ...)
    ///
    /// List operators (`IN`, `NOT IN`, `BETWEEN`) take a JSON array. An unknown
    /// operator is reported by the terminal call.
    pub fn where_op<T: Into<Value>>(self, column: &str, operator: &str, value: T) -> Self {
        self.push_parsed(Conjunction::And, column, operator, value.into())
    }

    /// Add WHERE condition with a typed operator
    pub fn where_operator<T: Into<Value>>(self, column: &str, operator: QueryOperator, value: T) -> Self {
        let value: Value = value.into();
        let values = match value {
            _ if operator.is_unary() => Vec::new(),
            Value::Array(items) if operator.is_list() => items,
            value => vec![value],
        };
        self.push_condition(Conjunction::And, column, operator, values)
    }

    /// Add OR WHERE condition with equality
    pub fn or_where_eq<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_condition(Conjunction::Or, column, QueryOperator::Equal, vec![value.into()])
    }

    /// Add OR WHERE condition with an operator given as text
    pub fn or_where<T: Into<Value>>(self, column: &str, operator: &str, value: T) -> Self {
        self.push_parsed(Conjunction::Or, column, operator, value.into())
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_condition(Conjunction::And, column, QueryOperator::NotEqual, vec![value.into()])
    }

    /// Add WHERE condition with greater than
    pub fn where_gt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_condition(Conjunction::And, column, QueryOperator::GreaterThan, vec![value.into()])
    }

    /// Add WHERE condition with greater than or equal
    pub fn where_gte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_condition(
            Conjunction::And,
            column,
            QueryOperator::GreaterThanOrEqual,
            vec![value.into()],
        )
    }

    /// Add WHERE condition with less than
    pub fn where_lt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_condition(Conjunction::And, column, QueryOperator::LessThan, vec![value.into()])
    }

    /// Add WHERE condition with less than or equal
    pub fn where_lte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_condition(
            Conjunction::And,
            column,
            QueryOperator::LessThanOrEqual,
            vec![value.into()],
        )
    }

    /// Add WHERE condition with LIKE
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.push_condition(
            Conjunction::And,
            column,
            QueryOperator::Like,
            vec![Value::String(pattern.to_string())],
        )
    }

    /// Add WHERE condition with NOT LIKE
    pub fn where_not_like(self, column: &str, pattern: &str) -> Self {
        self.push_condition(
            Conjunction::And,
            column,
            QueryOperator::NotLike,
            vec![Value::String(pattern.to_string())],
        )
    }

    /// Add WHERE IN condition; an empty list matches no rows
    pub fn where_in<I, T>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_condition(Conjunction::And, column, QueryOperator::In, values)
    }

    /// Add WHERE NOT IN condition; an empty list matches every row
    pub fn where_not_in<I, T>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_condition(Conjunction::And, column, QueryOperator::NotIn, values)
    }

    /// Add WHERE IS NULL condition
    pub fn where_null(self, column: &str) -> Self {
        self.push_condition(Conjunction::And, column, QueryOperator::IsNull, Vec::new())
    }

    /// Add WHERE IS NOT NULL condition
    pub fn where_not_null(self, column: &str) -> Self {
        self.push_condition(Conjunction::And, column, QueryOperator::IsNotNull, Vec::new())
    }

    /// Add WHERE BETWEEN condition (inclusive on both ends)
    pub fn where_between<T: Into<Value>>(self, column: &str, low: T, high: T) -> Self {
        self.push_condition(
            Conjunction::And,
            column,
            QueryOperator::Between,
            vec![low.into(), high.into()],
        )
    }
}
