//! Record types flowing through the indexing pipeline
//!
//! Snapshot records (`DhtEntry`, `RawNamespaceRecord`) are parsed straight
//! from the input files. Everything else is derived and persisted through
//! the [`ProfileStore`](crate::store::ProfileStore).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque content hash used as an exact-match key into the DHT state
pub type ContentHash = String;

/// One entry of the DHT snapshot: a content hash and the profile blob stored under it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DhtEntry {
    pub key: ContentHash,
    pub value: Value,
}

/// One entry of the namespace (blockchain) snapshot, as found on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNamespaceRecord {
    /// Fully-qualified name, e.g. `alice.id`
    pub fqu: String,
    pub value_hash: ContentHash,
}

/// A namespace record after the username has been derived from `fqu`
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceEntry {
    pub username: String,
    pub value_hash: ContentHash,
}

/// A username joined to the profile blob its value hash resolved to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceProfile {
    pub username: String,
    pub profile: Value,
}

/// Canonical per-user search record
///
/// `name` and `twitter_handle` serialize as `null` when nothing could be
/// extracted; they are never omitted from the stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchProfile {
    pub username: String,
    pub name: Option<String>,
    pub twitter_handle: Option<String>,
    pub profile: Value,
}

/// The three deduplicated lookup fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Name,
    TwitterHandle,
    Username,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::Name, FieldKind::TwitterHandle, FieldKind::Username];

    /// Document field holding this value, both in caches and in search profiles
    pub fn field(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::TwitterHandle => "twitter_handle",
            Self::Username => "username",
        }
    }
}

/// Deduplicated set of one extracted field across all users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCache {
    pub kind: FieldKind,
    pub values: BTreeSet<String>,
}

impl FieldCache {
    pub fn new(kind: FieldKind, values: impl IntoIterator<Item = String>) -> Self {
        Self {
            kind,
            values: values.into_iter().collect(),
        }
    }

    /// Stored shape: `{"<field>": [..values..]}`
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            self.kind.field().to_string(),
            Value::Array(self.values.iter().cloned().map(Value::String).collect()),
        );
        Value::Object(doc)
    }

    /// Inverse of [`to_document`](Self::to_document); non-string entries are ignored
    pub fn from_document(kind: FieldKind, doc: &Value) -> Self {
        let values = doc
            .get(kind.field())
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self { kind, values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_profile_keeps_absent_fields_as_null() {
        let profile = SearchProfile {
            username: "alice".to_string(),
            name: None,
            twitter_handle: None,
            profile: json!({}),
        };
        let doc = serde_json::to_value(&profile).unwrap();
        assert_eq!(doc["name"], Value::Null);
        assert_eq!(doc["twitter_handle"], Value::Null);
        assert!(doc.as_object().unwrap().contains_key("name"));
    }

    #[test]
    fn test_field_cache_document_shape() {
        let cache = FieldCache::new(
            FieldKind::TwitterHandle,
            vec!["b".to_string(), "a".to_string(), "b".to_string()],
        );
        assert_eq!(cache.values.len(), 2);

        let doc = cache.to_document();
        assert_eq!(doc, json!({"twitter_handle": ["a", "b"]}));
        assert_eq!(FieldCache::from_document(FieldKind::TwitterHandle, &doc), cache);
    }

    #[test]
    fn test_raw_namespace_record_ignores_extra_fields() {
        let record: RawNamespaceRecord = serde_json::from_value(json!({
            "fqu": "alice.id",
            "value_hash": "h1",
            "owner": "1abc"
        }))
        .unwrap();
        assert_eq!(record.fqu, "alice.id");
        assert_eq!(record.value_hash, "h1");
    }
}
