//! Record - the attribute bag behind one table row
//!
//! A `Record<M>` holds the current attributes of an entity, the last
//! persisted snapshot (`original`) used for dirty tracking, and whether the
//! row exists in storage. Writes go through the entity's fillable policy;
//! hydration from storage is trusted and bypasses it.

use std::fmt;
use std::marker::PhantomData;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use super::core_trait::{Model, CREATED_AT, DELETED_AT, UPDATED_AT};
use super::fillable::FillablePolicy;
use crate::backends::{format_timestamp, Attributes};
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::query::{dml, QueryBuilder};

/// One row of `M`'s table
pub struct Record<M> {
    attributes: Attributes,
    original: Attributes,
    exists: bool,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Record<M> {
    fn clone(&self) -> Self {
        Self {
            attributes: self.attributes.clone(),
            original: self.original.clone(),
            exists: self.exists,
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("attributes", &self.attributes)
            .field("exists", &self.exists)
            .finish()
    }
}

impl<M> PartialEq for Record<M> {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
            && self.original == other.original
            && self.exists == other.exists
    }
}

impl<M> Serialize for Record<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

impl<M: Model> Default for Record<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Record<M> {
    /// An empty, transient record
    pub fn new() -> Self {
        Self {
            attributes: Attributes::new(),
            original: Attributes::new(),
            exists: false,
            _model: PhantomData,
        }
    }

    /// A transient record filled from `data` through the fillable policy
    pub fn from_attributes(data: Attributes) -> Self {
        let mut record = Self::new();
        record.fill(data);
        record
    }

    /// A record loaded from storage: `original` mirrors `attributes`
    ///
    /// `exists` is set only when the row carries a non-null primary key.
    pub fn hydrate(attributes: Attributes) -> Self {
        let exists = attributes
            .get(M::primary_key_name())
            .map_or(false, |key| !key.is_null());
        Self {
            original: attributes.clone(),
            attributes,
            exists,
            _model: PhantomData,
        }
    }

    /// A transient record built from a typed entity value, bypassing the fillable policy
    pub fn from_model(model: &M) -> ModelResult<Self>
    where
        M: Serialize,
    {
        match serde_json::to_value(model)? {
            Value::Object(attributes) => Ok(Self {
                attributes,
                original: Attributes::new(),
                exists: false,
                _model: PhantomData,
            }),
            other => Err(ModelError::Serialization(format!(
                "{} did not serialize to an object: {}",
                M::table_name(),
                other
            ))),
        }
    }

    /// Typed view of the stored attributes
    pub fn to_model(&self) -> ModelResult<M>
    where
        M: DeserializeOwned,
    {
        Ok(serde_json::from_value(Value::Object(self.attributes.clone()))?)
    }

    /// Assign the fillable subset of `data`; other keys are dropped
    pub fn fill(&mut self, data: Attributes) -> &mut Self {
        let (allowed, rejected) = FillablePolicy::of::<M>().partition(data);
        if !rejected.is_empty() {
            debug!(
                "Dropped non-fillable attributes for {}: {}",
                M::table_name(),
                rejected.join(", ")
            );
        }
        self.attributes.extend(allowed);
        self
    }

    /// Assign `data`, rejecting the whole mapping if any key is not fillable
    pub fn fill_strict(&mut self, data: Attributes) -> ModelResult<&mut Self> {
        let (allowed, rejected) = FillablePolicy::of::<M>().partition(data);
        if !rejected.is_empty() {
            return Err(ModelError::MassAssignment(rejected));
        }
        self.attributes.extend(allowed);
        Ok(self)
    }

    /// Set one attribute directly, bypassing the fillable policy
    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Stored attribute by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Stored attribute, falling back to a computed accessor
    pub fn get_attribute(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.attributes.get(key) {
            return Some(value.clone());
        }
        M::accessors()
            .iter()
            .find(|accessor| accessor.name == key)
            .and_then(|accessor| (accessor.derive)(self))
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Non-null primary key value
    pub fn primary_key(&self) -> Option<&Value> {
        self.attributes
            .get(M::primary_key_name())
            .filter(|value| !value.is_null())
    }

    /// Attributes that differ from the last persisted snapshot
    pub fn dirty(&self) -> Attributes {
        self.attributes
            .iter()
            .filter(|(key, value)| self.original.get(key.as_str()) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    /// Last persisted snapshot
    pub fn original(&self) -> &Attributes {
        &self.original
    }

    /// Accept the current attributes as persisted
    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Stored attributes (computed attributes excluded)
    pub fn to_map(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_map(self) -> Attributes {
        self.attributes
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.attributes.clone())
    }

    /// Insert or update this record
    ///
    /// A new record is inserted with its non-null attributes, then re-read
    /// so `attributes` and `original` match what storage holds. An existing
    /// record writes only its dirty attributes plus `updated_at`; with
    /// nothing to write and no timestamps it returns `true` without touching
    /// storage.
    pub async fn save(&mut self, db: &Database) -> ModelResult<bool> {
        if self.exists {
            self.perform_update(db).await
        } else {
            self.perform_insert(db).await
        }
    }

    async fn perform_update(&mut self, db: &Database) -> ModelResult<bool> {
        let id = self.primary_key().cloned().ok_or(ModelError::MissingPrimaryKey)?;

        let mut changes = self.dirty();
        changes.remove(M::primary_key_name());
        if changes.is_empty() && !M::uses_timestamps() {
            return Ok(true);
        }

        if M::uses_timestamps() {
            let now = Value::String(format_timestamp(Utc::now()));
            self.attributes.insert(UPDATED_AT.to_string(), now.clone());
            changes.insert(UPDATED_AT.to_string(), now);
        }

        let statement = dml::update::<M>(db.backend(), &id, &changes)?;
        let affected = db.execute(&statement).await?;
        if affected == 0 {
            return Ok(false);
        }

        self.sync_original();
        Ok(true)
    }

    async fn perform_insert(&mut self, db: &Database) -> ModelResult<bool> {
        if M::uses_timestamps() {
            let now = Value::String(format_timestamp(Utc::now()));
            let created = self.attributes.get(CREATED_AT).map_or(true, Value::is_null);
            if created {
                self.attributes.insert(CREATED_AT.to_string(), now.clone());
            }
            self.attributes.insert(UPDATED_AT.to_string(), now);
        }

        let values: Attributes = self
            .attributes
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let statement = dml::insert::<M>(db.backend(), &values)?;
        let assigned = db.insert(&statement, M::primary_key_name()).await?;

        let id = match (assigned, self.primary_key()) {
            (Some(id), _) => Value::from(id),
            (None, Some(existing)) => existing.clone(),
            (None, None) => return Err(ModelError::MissingPrimaryKey),
        };

        let stored = QueryBuilder::<M>::new()
            .with_trashed()
            .where_eq(M::primary_key_name(), id)
            .first_or_fail(db)
            .await?;
        *self = stored;
        Ok(true)
    }

    /// Delete this record: a tombstone for soft-deleting entities, otherwise physically
    pub async fn delete(&mut self, db: &Database) -> ModelResult<bool> {
        if !self.exists {
            return Err(ModelError::MissingPrimaryKey);
        }
        let id = self.primary_key().cloned().ok_or(ModelError::MissingPrimaryKey)?;

        if !M::uses_soft_deletes() {
            return self.force_delete(db).await;
        }

        let now = format_timestamp(Utc::now());
        let statement = dml::set_tombstone::<M>(db.backend(), &id, Some(&now))?;
        let deleted = db.execute(&statement).await? > 0;
        if deleted {
            self.attributes.insert(DELETED_AT.to_string(), Value::String(now));
            self.sync_original();
        }
        Ok(deleted)
    }

    /// Remove this record's row physically
    pub async fn force_delete(&mut self, db: &Database) -> ModelResult<bool> {
        let id = self.primary_key().cloned().ok_or(ModelError::MissingPrimaryKey)?;
        let statement = dml::delete::<M>(db.backend(), &id)?;
        let deleted = db.execute(&statement).await? > 0;
        if deleted {
            self.exists = false;
        }
        Ok(deleted)
    }

    /// Reload attributes from storage, discarding unsaved changes
    pub async fn refresh(&mut self, db: &Database) -> ModelResult<()> {
        let id = self.primary_key().cloned().ok_or(ModelError::MissingPrimaryKey)?;
        *self = QueryBuilder::<M>::new()
            .with_trashed()
            .where_eq(M::primary_key_name(), id)
            .first_or_fail(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Accessor;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Widget {
        id: Option<i64>,
        sku: String,
        price: f64,
    }

    impl Model for Widget {
        fn table_name() -> &'static str {
            "widgets"
        }

        fn fillable() -> &'static [&'static str] {
            &["sku", "price"]
        }

        fn accessors() -> &'static [Accessor<Self>] {
            WIDGET_ACCESSORS
        }
    }

    const WIDGET_ACCESSORS: &[Accessor<Widget>] = &[Accessor {
        name: "label",
        derive: label,
    }];

    fn label(record: &Record<Widget>) -> Option<Value> {
        let sku = record.get("sku")?.as_str()?;
        Some(Value::String(format!("#{}", sku)))
    }

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_fill_drops_non_fillable_keys() {
        let record = Record::<Widget>::from_attributes(attrs(json!({
            "sku": "W1",
            "price": 10,
            "id": 99,
            "is_admin": true
        })));

        assert_eq!(record.to_map().len(), 2);
        assert!(record.get("id").is_none());
        assert!(!record.exists());
        assert!(record.primary_key().is_none());
    }

    #[test]
    fn test_fill_strict_rejects_whole_mapping() {
        let mut record = Record::<Widget>::new();
        let err = record
            .fill_strict(attrs(json!({"sku": "W1", "id": 4})))
            .unwrap_err();

        assert_eq!(err, ModelError::MassAssignment(vec!["id".to_string()]));
        assert!(record.to_map().is_empty());

        record.fill_strict(attrs(json!({"sku": "W1"}))).unwrap();
        assert_eq!(record.get("sku"), Some(&json!("W1")));
    }

    #[test]
    fn test_hydrate_without_key_is_not_persisted() {
        let keyed = Record::<Widget>::hydrate(attrs(json!({"id": 3, "sku": "W3"})));
        assert!(keyed.exists());

        let keyless = Record::<Widget>::hydrate(attrs(json!({"sku": "W3"})));
        assert!(!keyless.exists());
        let null_key = Record::<Widget>::hydrate(attrs(json!({"id": null, "sku": "W3"})));
        assert!(!null_key.exists());
    }

    #[test]
    fn test_dirty_tracking() {
        let mut record = Record::<Widget>::hydrate(attrs(json!({"id": 1, "sku": "W1", "price": 10})));
        assert!(record.exists());
        assert!(!record.is_dirty());

        record.set_attribute("price", 12);
        assert_eq!(record.dirty(), attrs(json!({"price": 12})));
        assert_eq!(record.original()["price"], json!(10));

        record.sync_original();
        assert!(!record.is_dirty());
    }

    #[test]
    fn test_computed_attributes_are_read_only_views() {
        let record = Record::<Widget>::from_attributes(attrs(json!({"sku": "W1"})));
        assert_eq!(record.get_attribute("label"), Some(json!("#W1")));
        assert_eq!(record.get_attribute("sku"), Some(json!("W1")));
        assert_eq!(record.get_attribute("missing"), None);
        assert!(!record.to_map().contains_key("label"));
    }

    #[test]
    fn test_typed_views() {
        let widget = Widget {
            id: None,
            sku: "W2".to_string(),
            price: 4.5,
        };
        let record = Record::<Widget>::from_model(&widget).unwrap();
        assert_eq!(record.get("price"), Some(&json!(4.5)));
        assert_eq!(record.to_model().unwrap(), widget);
        assert_eq!(serde_json::to_value(&record).unwrap()["sku"], json!("W2"));
    }
}
