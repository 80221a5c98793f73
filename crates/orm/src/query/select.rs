//! Query Builder projection and soft-delete scope

use super::builder::QueryBuilder;
use super::types::SoftDeleteScope;

impl<M> QueryBuilder<M> {
    /// Restrict the columns returned; defaults to all columns
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Include soft-deleted rows
    pub fn with_trashed(mut self) -> Self {
        self.soft_delete_scope = SoftDeleteScope::Include;
        self
    }

    /// Return only soft-deleted rows
    pub fn only_trashed(mut self) -> Self {
        self.soft_delete_scope = SoftDeleteScope::Only;
        self
    }
}
