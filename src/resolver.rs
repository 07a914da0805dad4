//! Namespace listing fetched from a remote resolver
//!
//! An alternative to the on-disk blockchain snapshot. The resolver answers
//! `GET {url}{all_users_endpoint}` with `{"results": [{fqu, value_hash}, ..]}`.
//! Failures are returned to the caller as-is; there is no retry.

use std::time::Duration;

use serde::Deserialize;

use crate::config::ResolverConfig;
use crate::schema::RawNamespaceRecord;
use crate::{IndexerError, Result};

#[derive(Debug, Deserialize)]
struct UsersResponse {
    results: Vec<RawNamespaceRecord>,
}

/// HTTP client for the resolver's user listing
pub struct ResolverClient {
    client: reqwest::Client,
    listing_url: String,
}

impl ResolverClient {
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("search-indexer/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IndexerError::RemoteFetch {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            listing_url: listing_url(config),
        })
    }

    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    /// Fetch every registered name from the resolver
    pub async fn fetch_namespace(&self) -> Result<Vec<RawNamespaceRecord>> {
        tracing::info!("[RESOLVER] Fetching namespace from {}", self.listing_url);

        let response = self
            .client
            .get(&self.listing_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| IndexerError::RemoteFetch {
                message: format!("Request to {} failed: {}", self.listing_url, e),
            })?;

        if !response.status().is_success() {
            return Err(IndexerError::RemoteFetch {
                message: format!(
                    "Resolver returned HTTP {}: {}",
                    response.status(),
                    self.listing_url
                ),
            });
        }

        let body = response.text().await.map_err(|e| IndexerError::RemoteFetch {
            message: format!("Failed to read response: {}", e),
        })?;

        let records = parse_listing(&body)?;
        tracing::info!("[RESOLVER] Fetched {} namespace records", records.len());
        Ok(records)
    }
}

fn listing_url(config: &ResolverConfig) -> String {
    format!("{}{}", config.url, config.all_users_endpoint)
}

/// Parse a resolver response body into namespace records
pub fn parse_listing(body: &str) -> Result<Vec<RawNamespaceRecord>> {
    let response: UsersResponse =
        serde_json::from_str(body).map_err(|e| IndexerError::RemoteFetch {
            message: format!("Unexpected resolver response: {}", e),
        })?;
    Ok(response.results)
}
