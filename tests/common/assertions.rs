//! Custom assertions for integration tests
//!
//! Helpers for reading back search profiles and field caches from a store.

use std::collections::BTreeSet;

use serde_json::Value;

use search_indexer::{read_field_cache, Collection, FieldKind, ProfileStore};

/// All stored search profiles, keyed by username
pub fn search_profiles<S: ProfileStore>(store: &S) -> Vec<(String, Value)> {
    let mut profiles: Vec<(String, Value)> = store
        .documents(Collection::SearchProfiles)
        .expect("Failed to read search profiles")
        .into_iter()
        .map(|doc| {
            let username = doc["username"]
                .as_str()
                .unwrap_or_else(|| panic!("search profile without username: {}", doc))
                .to_string();
            (username, doc)
        })
        .collect();
    profiles.sort_by(|a, b| a.0.cmp(&b.0));
    profiles
}

/// Contents of one field cache
pub fn cache_values<S: ProfileStore>(store: &S, kind: FieldKind) -> BTreeSet<String> {
    read_field_cache(store, kind)
        .expect("Failed to read field cache")
        .values
}

/// Assert a cache holds exactly the given values
pub fn assert_cache<S: ProfileStore>(store: &S, kind: FieldKind, expected: &[&str]) {
    let expected: BTreeSet<String> = expected.iter().map(|s| s.to_string()).collect();
    assert_eq!(
        cache_values(store, kind),
        expected,
        "unexpected contents of {:?} cache",
        kind
    );
}

/// Assert a search profile exists and return it
pub fn assert_profile<S: ProfileStore>(store: &S, username: &str) -> Value {
    store
        .find_one(Collection::SearchProfiles, "username", username)
        .expect("store lookup failed")
        .unwrap_or_else(|| panic!("expected a search profile for '{}'", username))
}

/// Assert no search profile exists for the username
pub fn assert_no_profile<S: ProfileStore>(store: &S, username: &str) {
    let found = store
        .find_one(Collection::SearchProfiles, "username", username)
        .expect("store lookup failed");
    assert!(
        found.is_none(),
        "expected no search profile for '{}', found {:?}",
        username,
        found
    );
}
