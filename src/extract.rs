//! Display-name and twitter-handle extraction from schema-flexible profiles
//!
//! Profile blobs come from an untrusted store and follow no single schema.
//! Each field is extracted by trying a short ordered list of shapes; the
//! first shape that matches wins.
//!
//! The two fields differ in how they treat a present-but-unrecognised value:
//!
//! - `name`: the record is still indexed, with no name.
//! - `twitter`: the record is skipped. Its name, if one was extracted,
//!   still reaches the name cache.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::joiner::PROGRESS_INTERVAL;
use crate::schema::{FieldCache, FieldKind, NamespaceProfile, SearchProfile};
use crate::store::{Collection, ProfileStore};
use crate::username::UsernamePolicy;
use crate::{IndexerError, Result};

/// Result of one extraction attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction<T> {
    Matched(T),
    Unmatched,
}

/// A single shape a field value may take
pub type Attempt = fn(&Value) -> Extraction<String>;

/// `{"formatted": "Jane Doe"}`
fn formatted_sub_field(value: &Value) -> Extraction<String> {
    lowercase_sub_field(value, "formatted")
}

/// `{"username": "JDoe"}`
fn username_sub_field(value: &Value) -> Extraction<String> {
    lowercase_sub_field(value, "username")
}

/// `"Jane Doe"`
fn plain_string(value: &Value) -> Extraction<String> {
    match value.as_str() {
        Some(s) => Extraction::Matched(s.to_lowercase()),
        None => Extraction::Unmatched,
    }
}

fn lowercase_sub_field(value: &Value, field: &str) -> Extraction<String> {
    match value.get(field).and_then(Value::as_str) {
        Some(s) => Extraction::Matched(s.to_lowercase()),
        None => Extraction::Unmatched,
    }
}

pub const NAME_ATTEMPTS: &[Attempt] = &[formatted_sub_field, plain_string];
pub const HANDLE_ATTEMPTS: &[Attempt] = &[username_sub_field, plain_string];

/// Apply attempts in order, returning the first match
pub fn first_match(value: &Value, attempts: &[Attempt]) -> Extraction<String> {
    attempts
        .iter()
        .map(|attempt| attempt(value))
        .find(|result| matches!(result, Extraction::Matched(_)))
        .unwrap_or(Extraction::Unmatched)
}

/// Outcome of extracting one optional profile field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// The profile has no such field
    Absent,
    Extracted(String),
    /// The field exists but matches none of the known shapes
    Unrecognised,
}

impl FieldOutcome {
    fn from_field(profile: Option<&Map<String, Value>>, key: &str, attempts: &[Attempt]) -> Self {
        match profile.and_then(|p| p.get(key)) {
            None => Self::Absent,
            Some(value) => match first_match(value, attempts) {
                Extraction::Matched(s) => Self::Extracted(s),
                Extraction::Unmatched => Self::Unrecognised,
            },
        }
    }
}

pub fn extract_name(profile: &Value) -> FieldOutcome {
    FieldOutcome::from_field(profile.as_object(), "name", NAME_ATTEMPTS)
}

pub fn extract_handle(profile: &Value) -> FieldOutcome {
    FieldOutcome::from_field(profile.as_object(), "twitter", HANDLE_ATTEMPTS)
}

/// Decode a profile body that may be stored as a JSON-encoded string
///
/// Strings that are not valid JSON are returned unchanged.
pub fn decode_profile_body(value: &Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

/// What happened to one namespace profile during extraction
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOutcome {
    Indexed {
        profile: SearchProfile,
        name_unrecognised: bool,
    },
    InvalidUsername,
    /// `twitter` present but in no known shape; any name extracted before
    /// the handle check is still carried out
    UnrecognisedHandle { name: Option<String> },
}

/// Build the search record for one namespace profile
pub fn extract_search_profile(
    entry: &NamespaceProfile,
    policy: &UsernamePolicy,
) -> ProfileOutcome {
    if !policy.is_valid_username(&entry.username) {
        return ProfileOutcome::InvalidUsername;
    }

    let profile = decode_profile_body(&entry.profile);

    let name = extract_name(&profile);
    let name_unrecognised = name == FieldOutcome::Unrecognised;
    let name = match name {
        FieldOutcome::Extracted(name) => Some(name),
        FieldOutcome::Absent | FieldOutcome::Unrecognised => None,
    };

    let twitter_handle = match extract_handle(&profile) {
        FieldOutcome::Extracted(handle) => Some(handle),
        FieldOutcome::Absent => None,
        FieldOutcome::Unrecognised => return ProfileOutcome::UnrecognisedHandle { name },
    };

    ProfileOutcome::Indexed {
        profile: SearchProfile {
            username: entry.username.clone(),
            name,
            twitter_handle,
            profile,
        },
        name_unrecognised,
    }
}

/// Raw (not yet deduplicated) field values gathered over one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAccumulator {
    pub names: Vec<String>,
    pub handles: Vec<String>,
    pub usernames: Vec<String>,
}

impl FieldAccumulator {
    pub fn record(&mut self, profile: &SearchProfile) {
        if let Some(name) = &profile.name {
            self.record_name(name.clone());
        }
        if let Some(handle) = &profile.twitter_handle {
            self.handles.push(handle.clone());
        }
        self.usernames.push(profile.username.clone());
    }

    /// Name of a record that is otherwise skipped
    pub fn record_name(&mut self, name: String) {
        self.names.push(name);
    }

    /// Reduce each stream to its distinct values
    pub fn into_caches(self) -> Vec<FieldCache> {
        vec![
            FieldCache::new(FieldKind::Name, self.names),
            FieldCache::new(FieldKind::TwitterHandle, self.handles),
            FieldCache::new(FieldKind::Username, self.usernames),
        ]
    }
}

/// Counters for one extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub processed: usize,
    pub indexed: usize,
    pub invalid_username: usize,
    pub skipped_handle: usize,
    pub name_unrecognised: usize,
}

/// Scan the namespace collection, persisting one search profile per
/// accepted username and gathering the raw field values
pub fn extract_search_profiles<S>(
    store: &S,
    policy: &UsernamePolicy,
) -> Result<(FieldAccumulator, ExtractStats)>
where
    S: ProfileStore + ?Sized,
{
    tracing::debug!("[INDEX] Creating search profiles");

    let mut acc = FieldAccumulator::default();
    let mut stats = ExtractStats::default();

    store.for_each(Collection::Namespace, &mut |doc| {
        stats.processed += 1;
        if stats.processed % PROGRESS_INTERVAL == 0 {
            tracing::debug!("[INDEX] Processed entries: {}", stats.processed);
        }

        let entry: NamespaceProfile =
            serde_json::from_value(doc).map_err(|e| IndexerError::Store {
                message: format!("Stored namespace profile is malformed: {}", e),
            })?;

        match extract_search_profile(&entry, policy) {
            ProfileOutcome::Indexed {
                profile,
                name_unrecognised,
            } => {
                if name_unrecognised {
                    stats.name_unrecognised += 1;
                }
                let doc = serde_json::to_value(&profile).map_err(|e| IndexerError::Store {
                    message: format!("Failed to encode search profile: {}", e),
                })?;
                store.upsert(Collection::SearchProfiles, &doc)?;
                acc.record(&profile);
                stats.indexed += 1;
            }
            ProfileOutcome::InvalidUsername => stats.invalid_username += 1,
            ProfileOutcome::UnrecognisedHandle { name } => {
                if let Some(name) = name {
                    acc.record_name(name);
                }
                stats.skipped_handle += 1;
            }
        }
        Ok(())
    })?;

    tracing::info!(
        "[INDEX] Indexed {} of {} profiles ({} invalid usernames, {} unrecognised handles)",
        stats.indexed,
        stats.processed,
        stats.invalid_username,
        stats.skipped_handle
    );
    Ok((acc, stats))
}
