//! Field caches and secondary indexes
//!
//! Each cache is a single document holding the distinct values of one
//! field. Writing a cache replaces the previous one outright.

use serde::Serialize;

use crate::extract::FieldAccumulator;
use crate::schema::{FieldCache, FieldKind};
use crate::store::{Collection, ProfileStore};
use crate::Result;

/// Secondary indexes requested after every index rebuild
pub const SEARCH_INDEXES: &[(Collection, &str)] = &[
    (Collection::PeopleCache, "name"),
    (Collection::TwitterCache, "twitter_handle"),
    (Collection::UsernameCache, "username"),
    (Collection::SearchProfiles, "name"),
    (Collection::SearchProfiles, "twitter_handle"),
    (Collection::SearchProfiles, "username"),
];

/// Distinct values written per cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub names: usize,
    pub handles: usize,
    pub usernames: usize,
}

/// Replace one cache document
pub fn write_field_cache<S>(store: &S, cache: &FieldCache) -> Result<()>
where
    S: ProfileStore + ?Sized,
{
    store.upsert(Collection::for_cache(cache.kind), &cache.to_document())
}

/// Current cache contents; empty when the cache has never been written
pub fn read_field_cache<S>(store: &S, kind: FieldKind) -> Result<FieldCache>
where
    S: ProfileStore + ?Sized,
{
    let docs = store.documents(Collection::for_cache(kind))?;
    Ok(docs
        .first()
        .map(|doc| FieldCache::from_document(kind, doc))
        .unwrap_or_else(|| FieldCache::new(kind, Vec::new())))
}

/// Request every search index; safe to call repeatedly
pub fn ensure_search_indexes<S>(store: &S) -> Result<()>
where
    S: ProfileStore + ?Sized,
{
    for (collection, field) in SEARCH_INDEXES {
        store.ensure_index(*collection, field)?;
    }
    tracing::info!("[INDEX] Optimized DB ({} indexes)", SEARCH_INDEXES.len());
    Ok(())
}

/// Deduplicate the gathered fields into caches, then ensure indexes
pub fn build_field_caches<S>(store: &S, acc: FieldAccumulator) -> Result<IndexStats>
where
    S: ProfileStore + ?Sized,
{
    let mut stats = IndexStats::default();
    for cache in acc.into_caches() {
        let distinct = cache.values.len();
        match cache.kind {
            FieldKind::Name => stats.names = distinct,
            FieldKind::TwitterHandle => stats.handles = distinct,
            FieldKind::Username => stats.usernames = distinct,
        }
        write_field_cache(store, &cache)?;
    }

    ensure_search_indexes(store)?;

    tracing::info!(
        "[INDEX] Created name/twitter/username caches ({} names, {} handles, {} usernames)",
        stats.names,
        stats.handles,
        stats.usernames
    );
    Ok(stats)
}
