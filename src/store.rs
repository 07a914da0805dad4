//! Document store for profile blobs, namespace associations and search records
//!
//! The pipeline talks to persistence only through the [`ProfileStore`]
//! trait. [`SqliteStore`] is the shipped implementation: one table per
//! collection, each row a JSON document keyed by the collection's unique
//! field, with secondary indexes built on `json_extract` expressions.

use std::fs;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::schema::FieldKind;
use crate::{IndexerError, Result};

/// Row key used by single-document cache collections
const SLOT_KEY: &str = "cache";

/// Logical collections persisted by the indexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Raw DHT blobs keyed by content hash
    ProfileData,
    /// Username -> profile blob associations
    Namespace,
    /// Per-user search records
    SearchProfiles,
    PeopleCache,
    TwitterCache,
    UsernameCache,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::ProfileData,
        Collection::Namespace,
        Collection::SearchProfiles,
        Collection::PeopleCache,
        Collection::TwitterCache,
        Collection::UsernameCache,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ProfileData => "profile_data",
            Self::Namespace => "namespace",
            Self::SearchProfiles => "search_profiles",
            Self::PeopleCache => "people_cache",
            Self::TwitterCache => "twitter_cache",
            Self::UsernameCache => "username_cache",
        }
    }

    /// Unique field documents are upserted by
    ///
    /// For cache collections this is the field holding the value set; the
    /// collection itself holds a single slot regardless of content.
    pub fn key_field(&self) -> &'static str {
        match self {
            Self::ProfileData => "key",
            Self::Namespace | Self::SearchProfiles => "username",
            Self::PeopleCache => FieldKind::Name.field(),
            Self::TwitterCache => FieldKind::TwitterHandle.field(),
            Self::UsernameCache => FieldKind::Username.field(),
        }
    }

    /// Single-document collections: every upsert replaces the one document
    pub fn is_slot(&self) -> bool {
        matches!(
            self,
            Self::PeopleCache | Self::TwitterCache | Self::UsernameCache
        )
    }

    pub fn for_cache(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Name => Self::PeopleCache,
            FieldKind::TwitterHandle => Self::TwitterCache,
            FieldKind::Username => Self::UsernameCache,
        }
    }

    fn document_key(&self, document: &Value) -> Result<String> {
        if self.is_slot() {
            return Ok(SLOT_KEY.to_string());
        }
        document
            .get(self.key_field())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| IndexerError::Store {
                message: format!(
                    "document for {} has no string '{}' field",
                    self.name(),
                    self.key_field()
                ),
            })
    }
}

/// Operations the pipeline needs from persistence
pub trait ProfileStore {
    /// Insert or entirely replace the document with the same key field
    fn upsert(&self, collection: Collection, document: &Value) -> Result<()>;

    /// First document whose `field` equals `value`; `Ok(None)` when nothing matches
    fn find_one(&self, collection: Collection, field: &str, value: &str) -> Result<Option<Value>>;

    /// Create a secondary index on `field`; a no-op if it already exists
    fn ensure_index(&self, collection: Collection, field: &str) -> Result<()>;

    /// Remove every document and index of the collection
    fn drop_collection(&self, collection: Collection) -> Result<()>;

    /// Stream every document of the collection in insertion order
    fn for_each(
        &self,
        collection: Collection,
        f: &mut dyn FnMut(Value) -> Result<()>,
    ) -> Result<()>;

    fn count(&self, collection: Collection) -> Result<usize>;

    fn documents(&self, collection: Collection) -> Result<Vec<Value>> {
        let mut docs = Vec::new();
        self.for_each(collection, &mut |doc| {
            docs.push(doc);
            Ok(())
        })?;
        Ok(docs)
    }
}

/// SQLite-backed [`ProfileStore`]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store file, creating its parent directory if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| IndexerError::Store {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;

        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        for collection in Collection::ALL {
            store.create_table(collection)?;
        }
        Ok(store)
    }

    // Tables always exist, so scans never race with DDL on the same connection.
    fn create_table(&self, collection: Collection) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                key TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            );",
            collection.name()
        ))?;
        Ok(())
    }

    /// Names of the secondary indexes currently defined on a collection
    pub fn index_names(&self, collection: Collection) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL
             ORDER BY name",
        )?;
        let names = stmt
            .query_map(params![collection.name()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl ProfileStore for SqliteStore {
    fn upsert(&self, collection: Collection, document: &Value) -> Result<()> {
        let key = collection.document_key(document)?;
        let doc = serde_json::to_string(document).map_err(|e| IndexerError::Store {
            message: format!("Failed to serialize document: {}", e),
        })?;

        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT OR REPLACE INTO {} (key, doc) VALUES (?1, ?2)",
            collection.name()
        ))?;
        stmt.execute(params![key, doc])?;
        Ok(())
    }

    fn find_one(&self, collection: Collection, field: &str, value: &str) -> Result<Option<Value>> {
        let sql = if field == collection.key_field() && !collection.is_slot() {
            format!("SELECT doc FROM {} WHERE key = ?1 LIMIT 1", collection.name())
        } else {
            format!(
                "SELECT doc FROM {} WHERE {} = ?1 LIMIT 1",
                collection.name(),
                field_expr(field)?
            )
        };

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let doc: Option<String> = stmt
            .query_row(params![value], |row| row.get(0))
            .optional()?;

        doc.map(|text| parse_document(&text)).transpose()
    }

    fn ensure_index(&self, collection: Collection, field: &str) -> Result<()> {
        let expr = field_expr(field)?;
        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{field} ON {table}({expr});",
            table = collection.name(),
            field = field,
            expr = expr
        ))?;
        Ok(())
    }

    fn drop_collection(&self, collection: Collection) -> Result<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {};", collection.name()))?;
        self.create_table(collection)
    }

    fn for_each(
        &self,
        collection: Collection,
        f: &mut dyn FnMut(Value) -> Result<()>,
    ) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT doc FROM {} ORDER BY rowid", collection.name()))?;
        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            f(parse_document(&text)?)?;
        }
        Ok(())
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// `json_extract` expression for a document field
///
/// Field names end up inside SQL text (index expressions must be literal),
/// so only identifier characters are accepted.
fn field_expr(field: &str) -> Result<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(IndexerError::Store {
            message: format!("invalid field name: {:?}", field),
        });
    }
    Ok(format!("json_extract(doc, '$.{}')", field))
}

fn parse_document(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| IndexerError::Store {
        message: format!("Stored document is not valid JSON: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_replaces_whole_document() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert(
                Collection::Namespace,
                &json!({"username": "alice", "profile": {"a": 1}, "extra": true}),
            )
            .unwrap();
        store
            .upsert(
                Collection::Namespace,
                &json!({"username": "alice", "profile": {"b": 2}}),
            )
            .unwrap();

        assert_eq!(store.count(Collection::Namespace).unwrap(), 1);
        let doc = store
            .find_one(Collection::Namespace, "username", "alice")
            .unwrap()
            .unwrap();
        assert_eq!(doc, json!({"username": "alice", "profile": {"b": 2}}));
    }

    #[test]
    fn test_find_one_absent_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(
            store.find_one(Collection::ProfileData, "key", "nope").unwrap(),
            None
        );
    }

    #[test]
    fn test_find_one_by_non_key_field() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert(
                Collection::SearchProfiles,
                &json!({"username": "alice", "name": "bob", "twitter_handle": null, "profile": {}}),
            )
            .unwrap();

        let doc = store
            .find_one(Collection::SearchProfiles, "name", "bob")
            .unwrap()
            .unwrap();
        assert_eq!(doc["username"], "alice");
    }

    #[test]
    fn test_upsert_requires_key_field() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .upsert(Collection::ProfileData, &json!({"value": {}}))
            .unwrap_err();
        assert!(matches!(err, IndexerError::Store { .. }));
    }

    #[test]
    fn test_slot_collection_keeps_single_document() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert(Collection::PeopleCache, &json!({"name": ["a", "b"]}))
            .unwrap();
        store
            .upsert(Collection::PeopleCache, &json!({"name": ["c"]}))
            .unwrap();

        assert_eq!(
            store.documents(Collection::PeopleCache).unwrap(),
            vec![json!({"name": ["c"]})]
        );
    }

    #[test]
    fn test_ensure_index_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_index(Collection::SearchProfiles, "name").unwrap();
        store.ensure_index(Collection::SearchProfiles, "name").unwrap();
        store
            .ensure_index(Collection::SearchProfiles, "twitter_handle")
            .unwrap();

        assert_eq!(
            store.index_names(Collection::SearchProfiles).unwrap(),
            vec![
                "idx_search_profiles_name".to_string(),
                "idx_search_profiles_twitter_handle".to_string()
            ]
        );
    }

    #[test]
    fn test_ensure_index_rejects_odd_field_names() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store
            .ensure_index(Collection::SearchProfiles, "name'); DROP TABLE x; --")
            .is_err());
    }

    #[test]
    fn test_drop_collection_empties_and_removes_indexes() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert(Collection::ProfileData, &json!({"key": "h1", "value": {}}))
            .unwrap();
        store.ensure_index(Collection::ProfileData, "key").unwrap();

        store.drop_collection(Collection::ProfileData).unwrap();
        store.drop_collection(Collection::ProfileData).unwrap();

        assert_eq!(store.count(Collection::ProfileData).unwrap(), 0);
        assert!(store.index_names(Collection::ProfileData).unwrap().is_empty());
    }

    #[test]
    fn test_for_each_propagates_callback_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert(Collection::ProfileData, &json!({"key": "h1", "value": {}}))
            .unwrap();

        let result = store.for_each(Collection::ProfileData, &mut |_| {
            Err(IndexerError::Store {
                message: "stop".to_string(),
            })
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("search.db");
        let store = SqliteStore::open(&path).unwrap();
        store
            .upsert(Collection::ProfileData, &json!({"key": "h1", "value": 1}))
            .unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.count(Collection::ProfileData).unwrap(), 1);
    }
}
