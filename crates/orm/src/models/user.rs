//! Storefront customer account

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backends::Attributes;
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::model::{CrudOperations, Model, Record};
use crate::query::dml;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl Model for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn fillable() -> &'static [&'static str] {
        &["email", "password", "first_name", "last_name"]
    }

    fn hidden() -> &'static [&'static str] {
        &["password"]
    }
}

/// Fields a customer may change on their own profile
const PROFILE_FIELDS: &[&str] = &["first_name", "last_name", "email"];

impl User {
    pub async fn find_by_email(db: &Database, email: &str) -> ModelResult<Option<Record<User>>> {
        User::find_by(db, "email", email).await
    }

    /// Argon2id PHC string for `password`
    pub fn hash_password(password: &str) -> ModelResult<String> {
        let salt = SaltString::generate(&mut thread_rng());
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ModelError::Hashing(e.to_string()))
    }

    /// Create an account, storing its password hashed
    pub async fn register(db: &Database, mut data: Attributes) -> ModelResult<Record<User>> {
        let password = data
            .get("password")
            .and_then(Value::as_str)
            .filter(|password| !password.is_empty())
            .ok_or_else(|| ModelError::Hashing("a non-empty password is required".to_string()))?;
        let hash = Self::hash_password(password)?;
        data.insert("password".to_string(), Value::String(hash));
        User::create(db, data).await
    }

    /// The account registered under `email`, when `password` matches it
    pub async fn authenticate(
        db: &Database,
        email: &str,
        password: &str,
    ) -> ModelResult<Option<Record<User>>> {
        Ok(User::find_by_email(db, email)
            .await?
            .filter(|user| user.verify_password(password)))
    }

    pub async fn update_password<T: Into<Value>>(db: &Database, id: T, password: &str) -> ModelResult<bool> {
        let mut data = Attributes::new();
        data.insert("password".to_string(), Value::String(Self::hash_password(password)?));
        User::update(db, id, data).await
    }

    /// Update name and email only, whatever else `data` carries
    pub async fn update_profile<T: Into<Value>>(db: &Database, id: T, data: Attributes) -> ModelResult<bool> {
        let profile: Attributes = data
            .into_iter()
            .filter(|(key, _)| PROFILE_FIELDS.contains(&key.as_str()))
            .collect();
        User::update(db, id, profile).await
    }

    /// Change an account's role; `role` is never mass assignable
    pub async fn set_role<T: Into<Value>>(db: &Database, id: T, role: &str) -> ModelResult<bool> {
        let mut changes = Attributes::new();
        changes.insert("role".to_string(), Value::from(role));
        let statement = dml::update::<User>(db.backend(), &id.into(), &changes)?;
        Ok(db.execute(&statement).await? > 0)
    }
}

impl Record<User> {
    pub fn is_admin(&self) -> bool {
        self.get("role").and_then(Value::as_str) == Some("admin")
    }

    /// Check `password` against the stored hash
    pub fn verify_password(&self, password: &str) -> bool {
        let Some(stored) = self.get("password").and_then(Value::as_str) else {
            return false;
        };
        match PasswordHash::new(stored) {
            Ok(hash) => Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok(),
            Err(_) => false,
        }
    }
}
