//! Username derivation and validation
//!
//! Namespace records carry fully-qualified names such as `alice.id`. The
//! username is obtained by trimming trailing suffix characters and then
//! trailing separator characters, both taken from configuration. Trimming
//! is character-set based: every trailing character contained in the set
//! is removed, so `alice.id` and `alice.idd` both become `alice`.

use regex::Regex;

use crate::config::UsernameConfig;
use crate::{IndexerError, Result};

/// Configured username rules
#[derive(Debug, Clone)]
pub struct UsernamePolicy {
    strip_suffix: String,
    strip_separator: String,
    pattern: Regex,
}

impl UsernamePolicy {
    pub fn from_config(config: &UsernameConfig) -> Result<Self> {
        let pattern = Regex::new(&config.pattern).map_err(|e| IndexerError::Config {
            message: format!("Invalid username pattern {:?}: {}", config.pattern, e),
        })?;

        Ok(Self {
            strip_suffix: config.strip_suffix.clone(),
            strip_separator: config.strip_separator.clone(),
            pattern,
        })
    }

    /// Username for a fully-qualified name
    pub fn derive_username<'a>(&self, fqu: &'a str) -> &'a str {
        fqu.trim_end_matches(|c: char| self.strip_suffix.contains(c))
            .trim_end_matches(|c: char| self.strip_separator.contains(c))
    }

    /// Whether the username is acceptable in the naming system
    pub fn is_valid_username(&self, username: &str) -> bool {
        self.pattern.is_match(username)
    }
}
