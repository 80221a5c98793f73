//! Core Model Trait - Base definition for database entities
//!
//! Defines the table metadata, mass-assignment policy, timestamp and soft
//! delete configuration, and the computed-attribute registry of an entity.

use serde_json::Value;

use super::record::Record;

/// Column stamped on insert when timestamps are tracked
pub const CREATED_AT: &str = "created_at";
/// Column stamped on every write when timestamps are tracked
pub const UPDATED_AT: &str = "updated_at";
/// Soft-delete tombstone column
pub const DELETED_AT: &str = "deleted_at";

/// A read-only attribute derived from a record's stored attributes
pub struct Accessor<M> {
    pub name: &'static str,
    pub derive: fn(&Record<M>) -> Option<Value>,
}

impl<M> std::fmt::Debug for Accessor<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor").field("name", &self.name).finish()
    }
}

/// Core trait for database models
pub trait Model: Sized + Send + Sync + 'static {
    /// Table name for this model
    fn table_name() -> &'static str;

    /// Primary key field name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Fields open to mass assignment
    fn fillable() -> &'static [&'static str] {
        &[]
    }

    /// Fields closed to mass assignment; `"*"` closes everything not fillable
    fn guarded() -> &'static [&'static str] {
        &["id"]
    }

    /// Fields whose bound values never appear in logs
    fn hidden() -> &'static [&'static str] {
        &[]
    }

    /// Check if this model uses timestamps (created_at, updated_at)
    fn uses_timestamps() -> bool {
        false
    }

    /// Check if this model supports soft deletes
    fn uses_soft_deletes() -> bool {
        false
    }

    /// Computed attributes, resolved after stored ones by `Record::get_attribute`
    fn accessors() -> &'static [Accessor<Self>] {
        &[]
    }
}
