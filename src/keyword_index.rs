//! Keyword index fallback adapter.
//!
//! Queries an Iconify-compatible public search API when no library family has
//! a match. The index is single-term, so only the first extracted keyword is
//! sent:
//!
//! ```text
//! GET {url}/search?query=<keyword>&limit=<n>   → { "icons": ["mdi:home", …] }
//! GET {url}/{prefix}/{name}.svg                → markup
//! ```
//!
//! Records are tagged `iconify:<prefix>`.

use anyhow::{bail, Result};
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;

use crate::config::KeywordIndexConfig;
use crate::keywords::extract_keywords;
use crate::models::{IconRecord, IconStyle, Resolution, SuppressedFailure, CODE_OK, MODEL_NONE};
use crate::normalize::to_display_name;

/// Stage tag used for suppressed failures.
pub const SOURCE_TAG: &str = "keyword-index";

/// Hard upper bound on results taken from one query.
pub const MAX_RESULTS: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    icons: Vec<String>,
}

pub struct KeywordIndex {
    base_url: String,
    limit: usize,
    client: reqwest::Client,
}

impl KeywordIndex {
    pub fn new(config: &KeywordIndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("icon-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            limit: config.limit.clamp(1, MAX_RESULTS),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The single query term sent for `term`.
    pub fn query_term(term: &str) -> Option<String> {
        extract_keywords(term)
            .into_iter()
            .next()
            .or_else(|| Some(term.trim().to_string()).filter(|t| !t.is_empty()))
    }

    /// Search the index and fetch the markup of each hit.
    pub async fn search(&self, term: &str, style: IconStyle) -> Resolution {
        let Some(keyword) = Self::query_term(term) else {
            return Resolution::default();
        };

        let ids = match self.query(&keyword).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::debug!(%keyword, error = %e, "keyword index query failed");
                return Resolution {
                    icons: Vec::new(),
                    suppressed: vec![SuppressedFailure::new(SOURCE_TAG, keyword, e)],
                };
            }
        };

        let hits: Vec<(String, String)> = ids
            .iter()
            .filter_map(|id| id.split_once(':'))
            .filter(|(prefix, name)| !prefix.is_empty() && !name.is_empty())
            .map(|(prefix, name)| (prefix.to_string(), name.to_string()))
            .take(self.limit)
            .collect();

        let fetches = hits.iter().map(|(prefix, name)| self.fetch(prefix, name));
        let bodies = join_all(fetches).await;

        let mut resolution = Resolution::default();
        for ((prefix, name), body) in hits.into_iter().zip(bodies) {
            match body {
                Ok(svg) => resolution.icons.push(IconRecord::new(
                    format!("iconify:{}", prefix),
                    to_display_name(&name),
                    svg,
                    style,
                    MODEL_NONE,
                    CODE_OK,
                )),
                Err(e) => {
                    let item = format!("{}:{}", prefix, name);
                    tracing::debug!(%item, error = %e, "keyword index fetch failed");
                    resolution
                        .suppressed
                        .push(SuppressedFailure::new(SOURCE_TAG, item, e));
                }
            }
        }
        resolution
    }

    async fn query(&self, keyword: &str) -> Result<Vec<String>> {
        let url = format!("{}/search", self.base_url);
        let limit = self.limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("query", keyword), ("limit", limit.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("search returned {}", status);
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.icons)
    }

    async fn fetch(&self, prefix: &str, name: &str) -> Result<String> {
        let url = format!("{}/{}/{}.svg", self.base_url, prefix, name);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("{} returned {}", url, status);
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            bail!("{} returned an empty body", url);
        }
        Ok(body)
    }
}
