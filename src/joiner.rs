//! Loading DHT blobs and joining namespace records to them
//!
//! The join is a per-record lookup of `value_hash` in the profile-data
//! collection. Records whose hash has not been replicated into the DHT
//! snapshot are skipped and only show up in the stats.

use serde::Serialize;

use crate::schema::{DhtEntry, NamespaceEntry, NamespaceProfile, RawNamespaceRecord};
use crate::store::{Collection, ProfileStore};
use crate::username::UsernamePolicy;
use crate::{IndexerError, Result};

/// Records between progress log lines
pub const PROGRESS_INTERVAL: usize = 1000;

/// Outcome of loading the DHT snapshot into the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DhtLoadStats {
    pub entries_loaded: usize,
}

/// Outcome of joining the namespace snapshot to the loaded blobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    /// Namespace records seen
    pub processed: usize,
    /// Records whose hash resolved and were persisted
    pub joined: usize,
    /// Records whose hash had no matching blob
    pub unresolved: usize,
}

/// Persist every DHT entry into the profile-data collection, keyed by hash
pub fn load_dht_entries<S>(
    store: &S,
    entries: impl IntoIterator<Item = DhtEntry>,
) -> Result<DhtLoadStats>
where
    S: ProfileStore + ?Sized,
{
    tracing::debug!("[DHT] Loading DHT state into {}", Collection::ProfileData.name());

    let mut stats = DhtLoadStats::default();
    for entry in entries {
        let doc = serde_json::to_value(&entry).map_err(|e| IndexerError::Store {
            message: format!("Failed to encode DHT entry {}: {}", entry.key, e),
        })?;
        store.upsert(Collection::ProfileData, &doc)?;

        stats.entries_loaded += 1;
        if stats.entries_loaded % PROGRESS_INTERVAL == 0 {
            tracing::debug!("[DHT] Processed entries: {}", stats.entries_loaded);
        }
    }

    store.ensure_index(Collection::ProfileData, "key")?;

    tracing::info!("[DHT] Loaded {} entries", stats.entries_loaded);
    Ok(stats)
}

/// Derive the username of a raw namespace record
pub fn to_namespace_entry(record: &RawNamespaceRecord, policy: &UsernamePolicy) -> NamespaceEntry {
    NamespaceEntry {
        username: policy.derive_username(&record.fqu).to_string(),
        value_hash: record.value_hash.clone(),
    }
}

/// Resolve one entry against the profile-data collection
pub fn resolve_entry<S>(store: &S, entry: NamespaceEntry) -> Result<Option<NamespaceProfile>>
where
    S: ProfileStore + ?Sized,
{
    let Some(doc) = store.find_one(Collection::ProfileData, "key", &entry.value_hash)? else {
        return Ok(None);
    };

    let blob: DhtEntry = serde_json::from_value(doc).map_err(|e| IndexerError::Store {
        message: format!("Stored DHT entry {} is malformed: {}", entry.value_hash, e),
    })?;

    Ok(Some(NamespaceProfile {
        username: entry.username,
        profile: blob.value,
    }))
}

/// Join namespace records to profile blobs and persist the associations
///
/// Records are processed in input order; a later record for the same
/// username replaces an earlier one.
pub fn join_namespace<S>(
    store: &S,
    records: impl IntoIterator<Item = RawNamespaceRecord>,
    policy: &UsernamePolicy,
) -> Result<JoinStats>
where
    S: ProfileStore + ?Sized,
{
    tracing::debug!("[NAMESPACE] Joining namespace to DHT state");

    let mut stats = JoinStats::default();
    for record in records {
        stats.processed += 1;
        if stats.processed % PROGRESS_INTERVAL == 0 {
            tracing::debug!("[NAMESPACE] Processed entries: {}", stats.processed);
        }

        let entry = to_namespace_entry(&record, policy);
        match resolve_entry(store, entry)? {
            Some(joined) => {
                let doc = serde_json::to_value(&joined).map_err(|e| IndexerError::Store {
                    message: format!("Failed to encode namespace profile: {}", e),
                })?;
                store.upsert(Collection::Namespace, &doc)?;
                stats.joined += 1;
            }
            None => stats.unresolved += 1,
        }
    }

    tracing::info!(
        "[NAMESPACE] Joined {} of {} records ({} unresolved)",
        stats.joined,
        stats.processed,
        stats.unresolved
    );
    Ok(stats)
}
