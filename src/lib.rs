//! search-indexer: builds name/handle/username search caches from two
//! offline snapshots of a decentralized naming system
//!
//! The DHT snapshot maps content hashes to profile blobs; the namespace
//! snapshot maps names to content hashes. A rebuild joins the two into
//! per-user search profiles and three deduplicated field caches, all held
//! in a [`ProfileStore`].
//!
//! # Example
//!
//! ```ignore
//! use search_indexer::{IndexerConfig, NamespaceSource, Pipeline, SqliteStore, UsernamePolicy};
//!
//! let config = IndexerConfig::load_from(Path::new("search-indexer.toml"))?;
//! let store = SqliteStore::open(&config.store.path)?;
//! let policy = UsernamePolicy::from_config(&config.username)?;
//!
//! let pipeline = Pipeline::new(&store, &config.state, policy);
//! let (namespace, index) = pipeline.full_refresh(NamespaceSource::Snapshot)?;
//! println!("{} / {}", namespace, index);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod index_builder;
pub mod joiner;
pub mod pipeline;
pub mod resolver;
pub mod schema;
pub mod state_reader;
pub mod store;
pub mod username;

// Re-export commonly used types
pub use cli::{Cli, OutputFormat};
pub use config::IndexerConfig;
pub use error::{IndexerError, Result};
pub use extract::{extract_search_profile, Extraction, FieldAccumulator, FieldOutcome};
pub use index_builder::read_field_cache;
pub use pipeline::{NamespaceSource, Operation, OperationReport, Pipeline};
pub use resolver::ResolverClient;
pub use schema::{
    DhtEntry, FieldCache, FieldKind, NamespaceEntry, NamespaceProfile, RawNamespaceRecord,
    SearchProfile,
};
pub use store::{Collection, ProfileStore, SqliteStore};
pub use username::UsernamePolicy;
