//! Query Builder Module - Fluent, parameterized query builder for model tables

pub mod builder;
pub(crate) mod dml;
pub mod execution;
pub mod ordering;
pub mod pagination;
pub mod select;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

pub use builder::QueryBuilder;
pub use pagination::{PageWindow, Paginated};
pub use types::{Conjunction, OrderDirection, QueryOperator, SoftDeleteScope, WhereCondition};
