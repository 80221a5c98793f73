//! Mass-assignment policy
//!
//! Three tiers, checked in order:
//! 1. `guarded` contains `"*"`: only `fillable` fields are writable.
//! 2. `fillable` is non-empty: only those fields are writable.
//! 3. Otherwise every field not listed in `guarded` is writable.

use crate::backends::Attributes;

use super::core_trait::Model;

/// Fillable/guarded lists for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillablePolicy<'a> {
    pub fillable: &'a [&'a str],
    pub guarded: &'a [&'a str],
}

impl FillablePolicy<'static> {
    /// The policy declared by `M`
    pub fn of<M: Model>() -> Self {
        Self {
            fillable: M::fillable(),
            guarded: M::guarded(),
        }
    }
}

impl<'a> FillablePolicy<'a> {
    pub fn new(fillable: &'a [&'a str], guarded: &'a [&'a str]) -> Self {
        Self { fillable, guarded }
    }

    pub fn is_fillable(&self, key: &str) -> bool {
        if self.guarded.contains(&"*") {
            return self.fillable.contains(&key);
        }
        if !self.fillable.is_empty() {
            return self.fillable.contains(&key);
        }
        !self.guarded.contains(&key)
    }

    /// Split `data` into the writable attributes and the rejected keys
    pub fn partition(&self, data: Attributes) -> (Attributes, Vec<String>) {
        let mut allowed = Attributes::new();
        let mut rejected = Vec::new();
        for (key, value) in data {
            if self.is_fillable(&key) {
                allowed.insert(key, value);
            } else {
                rejected.push(key);
            }
        }
        (allowed, rejected)
    }
}
