//! Primary Key System - Cache keys for records
//!
//! Supports integer, UUID, text and composite primary keys. Keys are hashable
//! and ordered so they can index the cache, and they can be recovered from a
//! join-key value read off a related record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Primary key types a cached record may carry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimaryKey {
    /// Auto-incrementing integer primary key
    Integer(i64),
    /// UUID primary key
    Uuid(Uuid),
    /// Natural text key (slugs, codes)
    Text(String),
    /// Composite primary key, field order preserved
    Composite(Vec<(String, String)>),
}

impl std::fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryKey::Integer(id) => write!(f, "{}", id),
            PrimaryKey::Uuid(id) => write!(f, "{}", id),
            PrimaryKey::Text(key) => write!(f, "{}", key),
            PrimaryKey::Composite(fields) => {
                let pairs: Vec<String> =
                    fields.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
                write!(f, "{}", pairs.join(","))
            }
        }
    }
}

impl Default for PrimaryKey {
    fn default() -> Self {
        PrimaryKey::Integer(0)
    }
}

impl From<i64> for PrimaryKey {
    fn from(id: i64) -> Self {
        PrimaryKey::Integer(id)
    }
}

impl From<Uuid> for PrimaryKey {
    fn from(id: Uuid) -> Self {
        PrimaryKey::Uuid(id)
    }
}

impl From<&str> for PrimaryKey {
    fn from(key: &str) -> Self {
        PrimaryKey::Text(key.to_string())
    }
}

impl PrimaryKey {
    /// Recover a key from a join-key value.
    ///
    /// Integers map to `Integer`, strings that parse as a UUID map to `Uuid` and
    /// any other string to `Text`. Null, booleans, floats, arrays and objects
    /// carry no key.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(PrimaryKey::Integer),
            Value::String(s) => match Uuid::parse_str(s) {
                Ok(id) => Some(PrimaryKey::Uuid(id)),
                Err(_) => Some(PrimaryKey::Text(s.clone())),
            },
            _ => None,
        }
    }

    /// The key as a join-key value, the inverse of [`PrimaryKey::from_value`]
    pub fn to_value(&self) -> Value {
        match self {
            PrimaryKey::Integer(id) => Value::from(*id),
            PrimaryKey::Uuid(id) => Value::String(id.to_string()),
            PrimaryKey::Text(key) => Value::String(key.clone()),
            PrimaryKey::Composite(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        }
    }

    /// Extract as i64 if this is an Integer primary key
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PrimaryKey::Integer(id) => Some(*id),
            _ => None,
        }
    }

    /// Extract as UUID if this is a UUID primary key
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            PrimaryKey::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    /// Check if this is a valid (non-default) primary key
    pub fn is_valid(&self) -> bool {
        match self {
            PrimaryKey::Integer(0) => false,
            PrimaryKey::Integer(_) => true,
            PrimaryKey::Uuid(uuid) => !uuid.is_nil(),
            PrimaryKey::Text(key) => !key.is_empty(),
            PrimaryKey::Composite(fields) => !fields.is_empty(),
        }
    }
}
