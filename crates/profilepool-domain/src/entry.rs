//! Entry module - the leasable record held in a profile pool

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Caller-defined payload of a profile entry (credentials, API keys, ...)
///
/// Kept as an ordered JSON object; the pool never interprets its fields
/// except for equality filtering.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Unique identifier for a profile entry based on UUIDv7
///
/// Assigned by the store when the entry is inserted and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u128);

impl EntryId {
    /// Generate a new UUIDv7-based EntryId
    ///
    /// # Examples
    ///
    /// ```
    /// use profilepool_domain::EntryId;
    ///
    /// let id = EntryId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an EntryId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Error returned when a string is not a valid entry id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid profile entry id: {0}")]
pub struct ParseEntryIdError(pub String);

impl FromStr for EntryId {
    type Err = ParseEntryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|_| ParseEntryIdError(s.to_string()))
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A profile entry - one leasable record with lock state, usage counters
/// and opaque metadata
///
/// Field names on the wire follow the persisted shape:
/// `{ id, name, locked, locked_dt, error_cnt, use_cnt, meta, disabled }`.
///
/// `locked` is true exactly when `locked_at` is set. The store only changes
/// both together through [`crate::LockState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// Unique identifier
    pub id: EntryId,

    /// Profile (pool) this entry belongs to
    pub name: String,

    /// Whether the entry is currently checked out
    pub locked: bool,

    /// When the current lock was taken
    #[serde(rename = "locked_dt")]
    pub locked_at: Option<DateTime<Utc>>,

    /// Number of releases flagged as errors
    #[serde(rename = "error_cnt")]
    pub error_count: u64,

    /// Number of releases
    #[serde(rename = "use_cnt")]
    pub use_count: u64,

    /// Caller-defined payload
    pub meta: Meta,

    /// Stored but not acted upon by any pool operation
    #[serde(default)]
    pub disabled: bool,
}

impl ProfileEntry {
    /// Flatten the entry into the shape handed to a claiming client:
    /// every `meta` field plus `id`.
    ///
    /// An `id` key inside `meta` is shadowed by the entry id.
    ///
    /// # Examples
    ///
    /// ```
    /// use profilepool_domain::{EntryId, Meta, ProfileEntry};
    ///
    /// let mut meta = Meta::new();
    /// meta.insert("username".into(), "u".into());
    /// let entry = ProfileEntry {
    ///     id: EntryId::new(),
    ///     name: "p1".into(),
    ///     locked: false,
    ///     locked_at: None,
    ///     error_count: 0,
    ///     use_count: 0,
    ///     meta,
    ///     disabled: false,
    /// };
    ///
    /// let flat = entry.flatten();
    /// assert_eq!(flat["username"], "u");
    /// assert_eq!(flat["id"], entry.id.to_string());
    /// ```
    pub fn flatten(&self) -> Meta {
        let mut flat = self.meta.clone();
        flat.insert("id".to_string(), serde_json::Value::String(self.id.to_string()));
        flat
    }
}

/// An entry to be inserted; the store fills in id, lock state and counters
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    /// Profile name
    pub name: String,

    /// Payload
    pub meta: Meta,
}

impl NewEntry {
    /// Create a new unlocked entry for the given profile
    pub fn new(name: impl Into<String>, meta: Meta) -> Self {
        Self {
            name: name.into(),
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entry() -> ProfileEntry {
        let meta = json!({"username": "u", "password": "p"});
        ProfileEntry {
            id: EntryId::new(),
            name: "p1".to_string(),
            locked: false,
            locked_at: None,
            error_count: 0,
            use_count: 0,
            meta: meta.as_object().cloned().unwrap(),
            disabled: false,
        }
    }

    #[test]
    fn test_entry_id_chronological() {
        let id1 = EntryId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = EntryId::new();

        assert!(id1 < id2);
    }

    #[test]
    fn test_entry_id_parse() {
        let id = EntryId::new();
        let parsed: EntryId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);

        assert!("not-a-valid-uuid".parse::<EntryId>().is_err());
        assert!("".parse::<EntryId>().is_err());
    }

    #[test]
    fn test_persisted_field_names() {
        let entry = sample_entry();
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["id"], entry.id.to_string());
        assert_eq!(value["name"], "p1");
        assert_eq!(value["locked"], false);
        assert!(value["locked_dt"].is_null());
        assert_eq!(value["error_cnt"], 0);
        assert_eq!(value["use_cnt"], 0);
        assert_eq!(value["meta"]["username"], "u");
        assert_eq!(value["disabled"], false);
    }

    #[test]
    fn test_flatten_keeps_meta_order_and_adds_id() {
        let entry = sample_entry();
        let flat = entry.flatten();

        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["username", "password", "id"]);
    }

    #[test]
    fn test_flatten_id_shadows_meta_id() {
        let mut entry = sample_entry();
        entry.meta.insert("id".to_string(), json!("from-meta"));

        let flat = entry.flatten();
        assert_eq!(flat["id"], entry.id.to_string());
    }
}
