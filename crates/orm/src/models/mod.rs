//! Storefront entities
//!
//! Each entity is a plain serde struct (the typed view of a row) plus its
//! `Model` metadata. Rows are handled as `Record<Entity>`.

pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use category::Category;
pub use order::Order;
pub use product::Product;
pub use user::User;

/// Boolean columns come back from some stores as 0/1 integers
pub(crate) mod flag {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
            Value::String(s) => matches!(s.as_str(), "1" | "true"),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Flags {
        #[serde(default, deserialize_with = "super::flag::deserialize")]
        on: bool,
    }

    #[test]
    fn test_flag_accepts_integers_and_bools() {
        for (raw, expected) in [
            (json!({"on": 1}), true),
            (json!({"on": 0}), false),
            (json!({"on": true}), true),
            (json!({"on": "1"}), true),
            (json!({"on": null}), false),
            (json!({}), false),
        ] {
            let flags: Flags = serde_json::from_value(raw).unwrap();
            assert_eq!(flags.on, expected);
        }
    }
}
