//! Pipeline driver: the named batch operations and their ordering
//!
//! | Operation        | Effect                                            |
//! |------------------|---------------------------------------------------|
//! | reset            | drop every collection                             |
//! | rebuild-namespace| load DHT blobs, join the namespace to them        |
//! | rebuild-index    | extract search profiles, write caches and indexes |
//! | optimize         | re-request the search indexes only                |
//! | full-refresh     | reset, rebuild-namespace, rebuild-index           |
//!
//! rebuild-index reads whatever namespace data is currently stored, so on
//! an empty store it produces empty caches rather than an error.

use std::fmt;

use serde::Serialize;

use crate::config::StateConfig;
use crate::extract::{extract_search_profiles, ExtractStats};
use crate::index_builder::{build_field_caches, ensure_search_indexes, IndexStats};
use crate::joiner::{join_namespace, load_dht_entries, DhtLoadStats, JoinStats};
use crate::schema::RawNamespaceRecord;
use crate::state_reader::{read_dht_state, read_namespace_state};
use crate::store::{Collection, ProfileStore};
use crate::username::UsernamePolicy;
use crate::{IndexerError, Result};

/// Named batch operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Reset,
    RebuildNamespace,
    RebuildIndex,
    Optimize,
    FullRefresh,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::RebuildNamespace => "rebuild-namespace",
            Self::RebuildIndex => "rebuild-index",
            Self::Optimize => "optimize",
            Self::FullRefresh => "full-refresh",
        }
    }
}

/// Where namespace records come from
#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceSource {
    /// The configured blockchain state file
    Snapshot,
    /// Records obtained elsewhere, e.g. from the resolver
    Records(Vec<RawNamespaceRecord>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceReport {
    pub dht: DhtLoadStats,
    pub join: JoinStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub extract: ExtractStats,
    pub caches: IndexStats,
}

/// What an operation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationReport {
    Reset,
    Namespace(NamespaceReport),
    Index(IndexReport),
    Optimized,
    Refresh {
        namespace: NamespaceReport,
        index: IndexReport,
    },
}

impl fmt::Display for NamespaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dht_entries: {}, namespace_joined: {}, namespace_unresolved: {}",
            self.dht.entries_loaded, self.join.joined, self.join.unresolved
        )
    }
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "search_profiles: {}, skipped: {}, names: {}, handles: {}, usernames: {}",
            self.extract.indexed,
            self.extract.invalid_username + self.extract.skipped_handle,
            self.caches.names,
            self.caches.handles,
            self.caches.usernames
        )
    }
}

impl OperationReport {
    /// Pretty JSON summary, tagged with the operation name
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| IndexerError::Store {
            message: format!("Failed to encode report: {}", e),
        })
    }
}

impl fmt::Display for OperationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => write!(f, "Flushed DB"),
            Self::Namespace(report) => write!(f, "Created namespace ({})", report),
            Self::Index(report) => write!(f, "Created search index ({})", report),
            Self::Optimized => write!(f, "Optimized DB"),
            Self::Refresh { namespace, index } => {
                write!(f, "Refreshed ({}, {})", namespace, index)
            }
        }
    }
}

/// Runs operations against one store
pub struct Pipeline<'a, S: ProfileStore + ?Sized> {
    store: &'a S,
    state: &'a StateConfig,
    policy: UsernamePolicy,
}

impl<'a, S: ProfileStore + ?Sized> Pipeline<'a, S> {
    pub fn new(store: &'a S, state: &'a StateConfig, policy: UsernamePolicy) -> Self {
        Self {
            store,
            state,
            policy,
        }
    }

    pub fn run(&self, operation: Operation, source: NamespaceSource) -> Result<OperationReport> {
        tracing::debug!("Running {}", operation.name());
        match operation {
            Operation::Reset => self.reset().map(|_| OperationReport::Reset),
            Operation::RebuildNamespace => {
                self.rebuild_namespace(source).map(OperationReport::Namespace)
            }
            Operation::RebuildIndex => self.rebuild_index().map(OperationReport::Index),
            Operation::Optimize => self.optimize().map(|_| OperationReport::Optimized),
            Operation::FullRefresh => {
                let (namespace, index) = self.full_refresh(source)?;
                Ok(OperationReport::Refresh { namespace, index })
            }
        }
    }

    /// Drop every persisted collection
    pub fn reset(&self) -> Result<()> {
        for collection in Collection::ALL {
            self.store.drop_collection(collection)?;
        }
        tracing::info!("[STORE] Flushed DB");
        Ok(())
    }

    /// Load the DHT snapshot and join the namespace to it
    ///
    /// Both inputs are read before anything is written, so a malformed
    /// snapshot leaves the store untouched.
    pub fn rebuild_namespace(&self, source: NamespaceSource) -> Result<NamespaceReport> {
        let dht_entries = read_dht_state(&self.state.dht_file)?;
        let records = match source {
            NamespaceSource::Snapshot => read_namespace_state(&self.state.blockchain_file)?,
            NamespaceSource::Records(records) => records,
        };

        let dht = load_dht_entries(self.store, dht_entries)?;
        let join = join_namespace(self.store, records, &self.policy)?;
        Ok(NamespaceReport { dht, join })
    }

    /// Extract search profiles from the stored namespace and rebuild the caches
    pub fn rebuild_index(&self) -> Result<IndexReport> {
        let (acc, extract) = extract_search_profiles(self.store, &self.policy)?;
        let caches = build_field_caches(self.store, acc)?;
        Ok(IndexReport { extract, caches })
    }

    /// Re-request the search indexes
    pub fn optimize(&self) -> Result<()> {
        ensure_search_indexes(self.store)
    }

    pub fn full_refresh(&self, source: NamespaceSource) -> Result<(NamespaceReport, IndexReport)> {
        self.reset()?;
        let namespace = self.rebuild_namespace(source)?;
        let index = self.rebuild_index()?;
        Ok((namespace, index))
    }
}
