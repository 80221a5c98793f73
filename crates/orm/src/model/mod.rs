//! Model System - active-record layer for database entities
//!
//! - `core_trait`: table metadata, field policy and accessor registry
//! - `fillable`: mass-assignment policy
//! - `record`: attribute bag with dirty tracking and instance persistence
//! - `crud_operations`: table-level operations for every model

pub mod core_trait;
pub mod crud_operations;
pub mod fillable;
pub mod record;

pub use core_trait::{Accessor, Model, CREATED_AT, DELETED_AT, UPDATED_AT};
pub use crud_operations::CrudOperations;
pub use fillable::FillablePolicy;
pub use record::Record;
