//! CLI argument definitions using clap
//!
//! The command surface is a set of mutually exclusive operation flags.
//! A missing or unrecognised operation prints the usage text and exits
//! successfully rather than failing.

use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::pipeline::Operation;

/// Usage text printed for a missing or unknown operation
pub const USAGE: &str = "\
Usage error

usage: search-indexer [--config <PATH>] [--from_resolver] <OPERATION>

operations:
  --flush              drop all persisted collections
  --create_namespace   load the DHT snapshot and join the namespace to it
  --create_index       build search profiles and field caches
  --optimize           (re)create the search indexes
  --refresh            flush, create_namespace, create_index
";

/// Build name/handle/username search caches from DHT and namespace snapshots
#[derive(Parser, Debug)]
#[command(name = "search-indexer")]
#[command(about = "Batch builder for profile search caches")]
#[command(version)]
#[command(group(
    ArgGroup::new("operation")
        .args(["flush", "create_namespace", "create_index", "optimize", "refresh"])
        .multiple(false)
))]
pub struct Cli {
    /// Drop all persisted collections
    #[arg(long = "flush")]
    pub flush: bool,

    /// Load the DHT snapshot and join the namespace to it
    #[arg(long = "create_namespace")]
    pub create_namespace: bool,

    /// Build search profiles, field caches and indexes
    #[arg(long = "create_index")]
    pub create_index: bool,

    /// Re-create the search indexes only
    #[arg(long = "optimize")]
    pub optimize: bool,

    /// Flush, then create namespace and index
    #[arg(long = "refresh")]
    pub refresh: bool,

    /// Configuration file
    #[arg(
        long,
        value_name = "PATH",
        env = "SEARCH_INDEXER_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Take the namespace listing from the resolver instead of the snapshot file
    #[arg(long = "from_resolver")]
    pub from_resolver: bool,

    /// Output format for the run summary
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Show debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    /// Selected operation, if any flag was given
    pub fn operation(&self) -> Option<Operation> {
        if self.flush {
            Some(Operation::Reset)
        } else if self.create_namespace {
            Some(Operation::RebuildNamespace)
        } else if self.create_index {
            Some(Operation::RebuildIndex)
        } else if self.optimize {
            Some(Operation::Optimize)
        } else if self.refresh {
            Some(Operation::FullRefresh)
        } else {
            None
        }
    }
}
