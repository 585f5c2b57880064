//! Source availability report (`icongw sources`, the `sources` tool).
//!
//! Checks only what can be known without a network call: whether each
//! family's local tree exists and whether each provider has its credential.

use anyhow::Result;
use serde::Serialize;

use crate::models::SubFormat;
use crate::pipeline::IconService;
use crate::provider::ProviderKind;

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    /// `library`, `index`, `text` or `image`.
    pub kind: String,
    pub status: String,
    pub available: bool,
}

pub fn get_sources(service: &IconService) -> Vec<SourceStatus> {
    let mut sources = Vec::new();

    for library in service.libraries().iter() {
        let family = library.family();
        let formats: Vec<Option<SubFormat>> = if family.sub_formats().is_empty() {
            vec![None]
        } else {
            family.sub_formats().iter().copied().map(Some).collect()
        };
        let local = formats
            .into_iter()
            .all(|f| library.local_dir(f).is_some_and(|d| d.is_dir()));

        sources.push(SourceStatus {
            name: family.tag().to_string(),
            kind: "library".to_string(),
            status: if local { "LOCAL + REMOTE" } else { "REMOTE" }.to_string(),
            available: true,
        });
    }

    sources.push(SourceStatus {
        name: "iconify".to_string(),
        kind: "index".to_string(),
        status: service.keyword_index().base_url().to_string(),
        available: true,
    });

    let priority = service.providers().priority();
    for provider in service.providers().providers() {
        let kind = match provider.kind() {
            ProviderKind::Text => "text",
            ProviderKind::Image => "image",
        };
        let status = if provider.has_credential() {
            match priority.iter().position(|p| p == provider.name()) {
                Some(rank) => format!("OK (priority {})", rank + 1),
                None if provider.kind() == ProviderKind::Image => "OK (explicit only)".to_string(),
                None => "OK (not in priority)".to_string(),
            }
        } else {
            format!(
                "NO CREDENTIAL ({})",
                provider.credential_env().unwrap_or("unknown")
            )
        };
        sources.push(SourceStatus {
            name: provider.name().to_string(),
            kind: kind.to_string(),
            status,
            available: provider.has_credential(),
        });
    }

    sources
}

pub fn list_sources(service: &IconService) -> Result<()> {
    println!("{:<14} {:<8} {:<40} AVAILABLE", "SOURCE", "KIND", "STATUS");
    for source in get_sources(service) {
        println!(
            "{:<14} {:<8} {:<40} {}",
            source.name, source.kind, source.status, source.available
        );
    }
    Ok(())
}
