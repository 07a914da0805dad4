//! Snapshot readers for the DHT and namespace state files
//!
//! Both snapshots are JSON arrays read in one go. A missing file, invalid
//! JSON, or a single record with the wrong shape fails the whole read.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::schema::{DhtEntry, RawNamespaceRecord};
use crate::{IndexerError, Result};

/// Read the DHT snapshot (`[{"key": .., "value": ..}, ..]`)
pub fn read_dht_state(path: &Path) -> Result<Vec<DhtEntry>> {
    read_json_array(path)
}

/// Read the namespace snapshot (`[{"fqu": .., "value_hash": ..}, ..]`)
pub fn read_namespace_state(path: &Path) -> Result<Vec<RawNamespaceRecord>> {
    read_json_array(path)
}

fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path).map_err(|e| IndexerError::MalformedInput {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let records: Vec<T> =
        serde_json::from_str(&content).map_err(|e| IndexerError::MalformedInput {
            path: path.display().to_string(),
            message: format!("expected a JSON array of records: {}", e),
        })?;

    tracing::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}
