//! Query Builder - Core builder implementation

use std::marker::PhantomData;

use super::types::*;
use crate::error::QueryError;

/// Query builder for one entity's table
///
/// Terminal operations (`get`, `first`, `count`, `paginate`) take the
/// builder by value, so its state is gone once a query has run.
#[derive(Debug)]
pub struct QueryBuilder<M> {
    pub(crate) select_fields: Vec<String>,
    pub(crate) where_conditions: Vec<WhereCondition>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) limit_count: Option<u64>,
    pub(crate) offset_value: Option<u64>,
    pub(crate) soft_delete_scope: SoftDeleteScope,
    /// First error raised while chaining; reported by the terminal call
    pub(crate) deferred_error: Option<QueryError>,
    _phantom: PhantomData<fn() -> M>,
}

impl<M> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            select_fields: self.select_fields.clone(),
            where_conditions: self.where_conditions.clone(),
            order_by: self.order_by.clone(),
            limit_count: self.limit_count,
            offset_value: self.offset_value,
            soft_delete_scope: self.soft_delete_scope,
            deferred_error: self.deferred_error.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<M> Default for QueryBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> QueryBuilder<M> {
    /// Create a new query builder
    pub fn new() -> Self {
        Self {
            select_fields: Vec::new(),
            where_conditions: Vec::new(),
            order_by: Vec::new(),
            limit_count: None,
            offset_value: None,
            soft_delete_scope: SoftDeleteScope::default(),
            deferred_error: None,
            _phantom: PhantomData,
        }
    }

    pub(crate) fn defer_error(&mut self, error: QueryError) {
        if self.deferred_error.is_none() {
            self.deferred_error = Some(error);
        }
    }

    /// Filters added so far
    pub fn conditions(&self) -> &[WhereCondition] {
        &self.where_conditions
    }
}
