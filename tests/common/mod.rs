//! Common test utilities and fixtures for search-indexer integration tests
//!
//! This module provides:
//! - `TestSnapshots` builder for writing snapshot files and a config into a temp dir
//! - Custom assertions over stored search profiles and field caches
//! - A one-shot HTTP responder for resolver-backed runs

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod assertions;
pub mod resolver;
pub mod snapshots;

pub use assertions::*;
pub use resolver::serve_once;
pub use snapshots::TestSnapshots;
