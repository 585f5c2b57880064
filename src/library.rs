//! Icon library source adapter.
//!
//! One [`LibrarySource`] per icon family. A lookup lists the family's files,
//! either from a local directory or from a remote "list contents" endpoint,
//! matches base names against the normalized term, and fetches the markup of
//! each match.
//!
//! # Local layout
//!
//! ```text
//! <root>/element-plus/*.svg
//! <root>/ant-design/outlined/*.svg
//! <root>/ant-design/filled/*.svg
//! ```
//!
//! # Remote listing
//!
//! The listing endpoint follows the GitHub contents API shape:
//!
//! ```json
//! [{ "name": "delete.svg", "type": "file", "download_url": "https://…/delete.svg" }]
//! ```
//!
//! For families with sub-formats the sub-format directory is appended to the
//! configured URL (`…/svg/outlined`).
//!
//! # Failure policy
//!
//! A listing failure empties the result for that listing; a failed item fetch
//! drops that item only. Both are recorded as [`SuppressedFailure`]s.

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use crate::config::LibrariesConfig;
use crate::models::{
    Family, IconRecord, Resolution, SubFormat, SuppressedFailure, CODE_OK, MODEL_NONE,
};
use crate::normalize::{normalize, to_display_name};

/// Per-call lookup flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupOptions {
    /// Read the local tree instead of the remote listing.
    pub local: bool,
    /// Require the normalized base name to equal the term.
    pub exact: bool,
    /// Restrict to one sub-format; ignored by single-format families.
    pub format: Option<SubFormat>,
}

/// One listed file, not yet fetched.
#[derive(Debug, Clone)]
struct ListingEntry {
    base_name: String,
    location: EntryLocation,
}

#[derive(Debug, Clone)]
enum EntryLocation {
    Local(PathBuf),
    Remote(String),
}

impl EntryLocation {
    fn describe(&self) -> String {
        match self {
            EntryLocation::Local(path) => path.display().to_string(),
            EntryLocation::Remote(url) => url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteEntry {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    download_url: Option<String>,
}

/// Library adapter for one family.
pub struct LibrarySource {
    family: Family,
    local_root: Option<PathBuf>,
    remote_url: String,
    token: Option<String>,
    include: GlobSet,
    max_matches: usize,
    client: reqwest::Client,
}

impl LibrarySource {
    pub fn new(family: Family, config: &LibrariesConfig) -> Result<Self> {
        let remote_url = match family {
            Family::ElementPlus => config.remote.element_plus_url.clone(),
            Family::AntDesign => config.remote.ant_design_url.clone(),
        };
        let token = std::env::var(&config.remote.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("icon-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            family,
            local_root: config.root.clone(),
            remote_url: remote_url.trim_end_matches('/').to_string(),
            token,
            include: build_globset(&config.include_globs)?,
            max_matches: config.max_matches,
            client,
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Directory holding this family's files for `format`, if a root is set.
    pub fn local_dir(&self, format: Option<SubFormat>) -> Option<PathBuf> {
        let mut dir = self.local_root.as_ref()?.join(self.family.tag());
        if let Some(format) = format {
            dir.push(format.dir());
        }
        Some(dir)
    }

    fn remote_listing_url(&self, format: Option<SubFormat>) -> String {
        match format {
            Some(format) => format!("{}/{}", self.remote_url, format.dir()),
            None => self.remote_url.clone(),
        }
    }

    /// Resolve `term` against this family.
    ///
    /// Families with sub-formats issue one listing per requested sub-format,
    /// concurrently, and suffix each name with the sub-format.
    pub async fn lookup(&self, term: &str, opts: LookupOptions) -> Resolution {
        let key = normalize(term);
        if key.is_empty() {
            return Resolution::default();
        }

        let formats: Vec<Option<SubFormat>> = match (self.family.sub_formats(), opts.format) {
            ([], _) => vec![None],
            (_, Some(format)) => vec![Some(format)],
            (all, None) => all.iter().copied().map(Some).collect(),
        };

        let lookups = formats
            .into_iter()
            .map(|format| self.lookup_format(&key, opts, format));

        let mut resolution = Resolution::default();
        for partial in join_all(lookups).await {
            resolution.merge(partial);
        }
        resolution
    }

    async fn lookup_format(
        &self,
        key: &str,
        opts: LookupOptions,
        format: Option<SubFormat>,
    ) -> Resolution {
        let listing = if opts.local {
            self.list_local(format)
        } else {
            self.list_remote(format).await
        };

        let entries = match listing {
            Ok(entries) => entries,
            Err(e) => {
                let item = if opts.local {
                    self.local_dir(format)
                        .map(|d| d.display().to_string())
                        .unwrap_or_else(|| "<no local root>".to_string())
                } else {
                    self.remote_listing_url(format)
                };
                tracing::debug!(family = self.family.tag(), %item, error = %e, "listing failed");
                return Resolution {
                    icons: Vec::new(),
                    suppressed: vec![SuppressedFailure::new(self.family.tag(), item, e)],
                };
            }
        };

        let matches = select_matches(entries, key, opts.exact, self.max_matches);

        let fetches = matches.iter().map(|entry| self.fetch(&entry.location));
        let bodies = join_all(fetches).await;

        let mut resolution = Resolution::default();
        for (entry, body) in matches.iter().zip(bodies) {
            match body {
                Ok(svg) => {
                    let mut name = to_display_name(&entry.base_name);
                    if let Some(format) = format {
                        name.push_str(format.suffix());
                    }
                    resolution.icons.push(IconRecord::new(
                        self.family.tag(),
                        name,
                        svg,
                        self.family.style(),
                        MODEL_NONE,
                        CODE_OK,
                    ));
                }
                Err(e) => {
                    let item = entry.location.describe();
                    tracing::debug!(family = self.family.tag(), %item, error = %e, "fetch failed");
                    resolution
                        .suppressed
                        .push(SuppressedFailure::new(self.family.tag(), item, e));
                }
            }
        }
        resolution
    }

    fn list_local(&self, format: Option<SubFormat>) -> Result<Vec<ListingEntry>> {
        let dir = self
            .local_dir(format)
            .ok_or_else(|| anyhow::anyhow!("no local library root configured"))?;
        if !dir.is_dir() {
            bail!("library directory does not exist: {}", dir.display());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !self.include.is_match(&file_name) {
                continue;
            }
            entries.push(ListingEntry {
                base_name: base_name(&file_name),
                location: EntryLocation::Local(entry.path().to_path_buf()),
            });
        }

        entries.sort_by(|a, b| a.base_name.cmp(&b.base_name));
        Ok(entries)
    }

    async fn list_remote(&self, format: Option<SubFormat>) -> Result<Vec<ListingEntry>> {
        let url = self.remote_listing_url(format);
        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("listing {} returned {}: {}", url, status, body);
        }

        let listing: Vec<RemoteEntry> = response
            .json()
            .await
            .with_context(|| format!("unexpected listing format from {}", url))?;

        Ok(listing
            .into_iter()
            .filter(|e| e.kind.is_empty() || e.kind == "file")
            .filter(|e| self.include.is_match(&e.name))
            .filter_map(|e| {
                let url = e.download_url?;
                Some(ListingEntry {
                    base_name: base_name(&e.name),
                    location: EntryLocation::Remote(url),
                })
            })
            .collect())
    }

    async fn fetch(&self, location: &EntryLocation) -> Result<String> {
        let body = match location {
            EntryLocation::Local(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
            EntryLocation::Remote(url) => {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    bail!("{} returned {}", url, status);
                }
                response.text().await?
            }
        };

        if body.trim().is_empty() {
            bail!("empty file");
        }
        Ok(body)
    }
}

/// Exact or substring matches; exact hits first, then shorter names.
fn select_matches(
    entries: Vec<ListingEntry>,
    key: &str,
    exact: bool,
    limit: usize,
) -> Vec<ListingEntry> {
    let mut matches: Vec<(String, ListingEntry)> = entries
        .into_iter()
        .filter_map(|entry| {
            let entry_key = normalize(&entry.base_name);
            let hit = if exact {
                entry_key == key
            } else {
                entry_key.contains(key)
            };
            hit.then_some((entry_key, entry))
        })
        .collect();

    matches.sort_by(|(a, _), (b, _)| {
        (a != key, a.len(), a.as_str()).cmp(&(b != key, b.len(), b.as_str()))
    });
    matches.truncate(limit);
    matches.into_iter().map(|(_, entry)| entry).collect()
}

/// File name without its final extension.
fn base_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Both families, built from one config.
pub struct LibrarySet {
    sources: Vec<LibrarySource>,
}

impl LibrarySet {
    pub fn new(config: &LibrariesConfig) -> Result<Self> {
        let sources = Family::ALL
            .iter()
            .map(|family| LibrarySource::new(*family, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sources })
    }

    pub fn get(&self, family: Family) -> &LibrarySource {
        // Both families are always constructed.
        self.sources
            .iter()
            .find(|s| s.family() == family)
            .unwrap_or(&self.sources[0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &LibrarySource> {
        self.sources.iter()
    }
}
