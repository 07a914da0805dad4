//! TestSnapshots builder: snapshot files, config file and store in a temp dir

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

use search_indexer::config::UsernameConfig;
use search_indexer::{IndexerConfig, SqliteStore, UsernamePolicy};

pub const DHT_FILE: &str = "dht_state.json";
pub const NAMESPACE_FILE: &str = "blockchain_state.json";
pub const CONFIG_FILE: &str = "search-indexer.toml";
pub const STORE_FILE: &str = "search.db";

/// Builder for a pair of snapshot files plus a matching configuration
pub struct TestSnapshots {
    dir: TempDir,
    dht: Vec<Value>,
    namespace: Vec<Value>,
    resolver_url: Option<String>,
}

impl TestSnapshots {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            dht: Vec::new(),
            namespace: Vec::new(),
            resolver_url: None,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a DHT entry `{key, value}`
    pub fn dht(mut self, key: &str, value: Value) -> Self {
        self.dht.push(json!({"key": key, "value": value}));
        self
    }

    /// Add a namespace entry `{fqu, value_hash}`
    pub fn name(mut self, fqu: &str, value_hash: &str) -> Self {
        self.namespace
            .push(json!({"fqu": fqu, "value_hash": value_hash}));
        self
    }

    /// Point the config's `[resolver]` section at `url`
    pub fn resolver(mut self, url: String) -> Self {
        self.resolver_url = Some(url);
        self
    }

    /// Write both snapshot files and the config; returns the config path
    pub fn write(&self) -> PathBuf {
        self.write_raw(
            &Value::Array(self.dht.clone()).to_string(),
            &Value::Array(self.namespace.clone()).to_string(),
        )
    }

    /// Write the given snapshot text verbatim (for malformed-input cases)
    pub fn write_raw(&self, dht: &str, namespace: &str) -> PathBuf {
        fs::write(self.path().join(DHT_FILE), dht).expect("Failed to write DHT snapshot");
        fs::write(self.path().join(NAMESPACE_FILE), namespace)
            .expect("Failed to write namespace snapshot");

        let mut config = format!(
            "[state]\ndht_file = \"{}\"\nblockchain_file = \"{}\"\n\n[store]\npath = \"{}\"\n",
            DHT_FILE, NAMESPACE_FILE, STORE_FILE
        );
        if let Some(url) = &self.resolver_url {
            config.push_str(&format!("\n[resolver]\nurl = \"{}\"\ntimeout_secs = 5\n", url));
        }

        let config_path = self.path().join(CONFIG_FILE);
        fs::write(&config_path, config).expect("Failed to write config");
        config_path
    }

    pub fn config(&self) -> IndexerConfig {
        IndexerConfig::load_from(&self.path().join(CONFIG_FILE)).expect("Failed to load config")
    }

    pub fn open_store(&self) -> SqliteStore {
        SqliteStore::open(&self.path().join(STORE_FILE)).expect("Failed to open store")
    }

    pub fn policy() -> UsernamePolicy {
        UsernamePolicy::from_config(&UsernameConfig::default()).expect("default policy")
    }

    /// Run the search-indexer binary with the snapshot config
    pub fn run_cli(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_search-indexer"))
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .env("SEARCH_INDEXER_CONFIG", self.path().join(CONFIG_FILE))
            .args(args)
            .output()
            .expect("Failed to run CLI")
    }

    /// Run CLI and expect success, return stdout
    pub fn run_cli_success(&self, args: &[&str]) -> String {
        let output = self.run_cli(args);
        assert!(
            output.status.success(),
            "CLI command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}

impl Default for TestSnapshots {
    fn default() -> Self {
        Self::new()
    }
}
