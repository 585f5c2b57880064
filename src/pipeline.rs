//! Icon resolution and category expansion.
//!
//! [`IconService`] owns every adapter and exposes the three operations the
//! façades call:
//!
//! - [`IconService::search_icons`] — library lookup per name, optionally
//!   falling back to the keyword index.
//! - [`IconService::generate_icon`] — the cascading resolution
//!   `library → generation → keyword index → stock`, short-circuiting on the
//!   first stage that yields records. Always returns at least one record.
//! - [`IconService::search_icons_by_category`] — enumerate icon names for a
//!   category, resolve each, pad with stock records to the requested count.
//!
//! No operation returns an error. Every failure that was swallowed on the way
//! is listed in [`Resolution::suppressed`] and reported to the [`Notifier`].

use anyhow::Result;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Config;
use crate::keyword_index::KeywordIndex;
use crate::keywords::{
    category_prompt, extract_keywords, parse_keyword_list, CATEGORY_SYSTEM_PROMPT,
};
use crate::library::{LibrarySet, LookupOptions};
use crate::models::{
    GenerationRequest, IconRecord, IconStyle, Resolution, SearchQuery, SuppressedFailure, CODE_OK,
};
use crate::normalize::synthesize_name;
use crate::notify::{Notifier, Stage, TracingNotifier};
use crate::present::dedupe;
use crate::provider::{ModelProvider, ProviderKind, ProviderRegistry};
use crate::stock::stock_icon;
use crate::svg::{extract_svg, is_plausible_svg};

/// Upper bound on a category expansion.
pub const MAX_CATEGORY_COUNT: usize = 50;

pub struct IconService {
    libraries: LibrarySet,
    index: KeywordIndex,
    providers: ProviderRegistry,
    notifier: Arc<dyn Notifier>,
    prefer_local: bool,
    default_count: usize,
}

impl IconService {
    /// Build every adapter from `config`. Provider credentials are read from
    /// the environment here.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            libraries: LibrarySet::new(&config.libraries)?,
            index: KeywordIndex::new(&config.keyword_index)?,
            providers: ProviderRegistry::from_config(&config.generation)?,
            notifier: Arc::new(TracingNotifier),
            prefer_local: config.libraries.prefer_local,
            default_count: config.generation.default_count,
        })
    }

    pub fn with_providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn libraries(&self) -> &LibrarySet {
        &self.libraries
    }

    pub fn keyword_index(&self) -> &KeywordIndex {
        &self.index
    }

    // ============ search ============

    /// Look every name up in the families selected by `query.style`.
    ///
    /// Names are resolved concurrently; the merged list is de-duplicated. An
    /// empty name list yields an empty result.
    pub async fn search_icons(&self, query: &SearchQuery) -> Resolution {
        let style = query.style.unwrap_or_default();
        let opts = LookupOptions {
            local: query.local.unwrap_or(self.prefer_local),
            exact: query.exact,
            format: query.format,
        };

        let lookups = query.names.iter().map(|name| async move {
            let found = self.lookup_families(name, style, opts, false).await;
            if !found.is_empty() || !query.fallback {
                return found;
            }
            let fallback = self.index.search(name, style).await;
            let mut suppressed = found.suppressed;
            suppressed.extend(fallback.suppressed);
            Resolution {
                icons: fallback.icons,
                suppressed,
            }
        });

        let mut resolution = Resolution::default();
        for partial in join_all(lookups).await {
            resolution.merge(partial);
        }
        self.report_suppressed(&resolution.suppressed);
        resolution.icons = dedupe(resolution.icons);
        resolution
    }

    /// Query each family of `style` concurrently. With `one_per_family`, only
    /// the best candidate of each family is kept.
    async fn lookup_families(
        &self,
        term: &str,
        style: IconStyle,
        opts: LookupOptions,
        one_per_family: bool,
    ) -> Resolution {
        let lookups = style
            .families()
            .iter()
            .map(|family| self.libraries.get(*family).lookup(term, opts));

        let mut resolution = Resolution::default();
        for mut partial in join_all(lookups).await {
            if one_per_family {
                partial.icons.truncate(1);
            }
            resolution.merge(partial);
        }
        resolution
    }

    // ============ generate ============

    /// Resolve a description to at least one icon.
    pub async fn generate_icon(&self, request: &GenerationRequest) -> Resolution {
        let description = request.description.trim();
        let override_name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let name = override_name
            .map(str::to_string)
            .unwrap_or_else(|| synthesize_name(description));
        let style = request.style;

        let mut suppressed = Vec::new();

        // Library: exact match, local tree only.
        let opts = LookupOptions {
            local: true,
            exact: true,
            format: None,
        };
        let library = self
            .lookup_families(&name, style, opts, style.is_unrestricted())
            .await;
        suppressed.extend(library.suppressed);
        if !library.icons.is_empty() {
            return self.finish(Stage::Library, &name, library.icons, suppressed);
        }
        self.notifier
            .stage_failed(Stage::Library, &name, "no exact match");

        // Generation.
        match self.generate_markup(description, &name, style, request.model.as_deref()).await {
            Ok(record) => return self.finish(Stage::Generation, &name, vec![record], suppressed),
            Err(failure) => {
                self.notifier
                    .stage_failed(Stage::Generation, &name, &failure.reason);
                suppressed.push(failure);
            }
        }

        // Keyword index.
        let term = override_name.unwrap_or(description);
        let index = self.index.search(term, style).await;
        suppressed.extend(index.suppressed);
        if !index.icons.is_empty() {
            return self.finish(Stage::KeywordIndex, &name, index.icons, suppressed);
        }
        self.notifier
            .stage_failed(Stage::KeywordIndex, &name, "no results");

        // Stock.
        let record = stock_icon(description, &name, style);
        self.finish(Stage::Stock, &name, vec![record], suppressed)
    }

    fn finish(
        &self,
        stage: Stage,
        subject: &str,
        icons: Vec<IconRecord>,
        suppressed: Vec<SuppressedFailure>,
    ) -> Resolution {
        let icons = dedupe(icons);
        self.notifier.stage_resolved(stage, subject, icons.len());
        self.report_suppressed(&suppressed);
        Resolution { icons, suppressed }
    }

    fn report_suppressed(&self, suppressed: &[SuppressedFailure]) {
        for failure in suppressed {
            self.notifier.suppressed(failure);
        }
    }

    /// The generation stage: one provider, one call, validated output.
    async fn generate_markup(
        &self,
        description: &str,
        name: &str,
        style: IconStyle,
        explicit: Option<&str>,
    ) -> Result<IconRecord, SuppressedFailure> {
        let stage = Stage::Generation.as_str();
        let provider = self.choose_provider(explicit, stage)?;

        let svg = match provider.kind() {
            ProviderKind::Text => {
                let reply = provider
                    .generate(&svg_prompt(description, style))
                    .await
                    .map_err(|e| SuppressedFailure::new(stage, provider.name(), e))?;
                extract_svg(&reply)
                    .filter(|svg| is_plausible_svg(svg))
                    .map(str::to_string)
                    .ok_or_else(|| {
                        SuppressedFailure::new(
                            stage,
                            provider.name(),
                            "reply did not contain usable SVG markup",
                        )
                    })?
            }
            ProviderKind::Image => {
                let url = provider
                    .generate(&image_prompt(description, style))
                    .await
                    .map_err(|e| SuppressedFailure::new(stage, provider.name(), e))?;
                wrap_image_url(url.trim())
            }
        };

        Ok(IconRecord::new(
            provider.name(),
            name,
            svg,
            style,
            provider.name(),
            CODE_OK,
        )
        .with_description(description))
    }

    fn choose_provider(
        &self,
        explicit: Option<&str>,
        stage: &str,
    ) -> Result<Arc<dyn ModelProvider>, SuppressedFailure> {
        self.providers.select(explicit).ok_or_else(|| match explicit {
            Some(name) if !name.trim().is_empty() => {
                SuppressedFailure::new(stage, name.trim(), "unknown provider")
            }
            _ => SuppressedFailure::new(stage, "priority", "no provider has a credential"),
        })
    }

    // ============ category ============

    /// Expand `category` into exactly `count` icons (default from config,
    /// clamped to `1..=50`).
    pub async fn search_icons_by_category(
        &self,
        category: &str,
        count: Option<usize>,
        style: IconStyle,
        model: Option<&str>,
    ) -> Resolution {
        let category = category.trim();
        let count = count
            .unwrap_or(self.default_count)
            .clamp(1, MAX_CATEGORY_COUNT);

        let mut suppressed = Vec::new();
        let keywords = match self.enumerate(category, count, model).await {
            Ok(keywords) if !keywords.is_empty() => keywords,
            result => {
                let reason = match result {
                    Err(failure) => {
                        let reason = failure.reason.clone();
                        suppressed.push(failure);
                        reason
                    }
                    Ok(_) => "empty reply".to_string(),
                };
                self.notifier
                    .stage_failed(Stage::Enumeration, category, &reason);
                extract_keywords(category)
            }
        };

        let mut icons: Vec<IconRecord> = Vec::with_capacity(count);
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for keyword in &keywords {
            if icons.len() >= count {
                break;
            }
            let mut request = GenerationRequest::new(keyword.as_str())
                .style(style)
                .name(keyword.as_str());
            request.model = model.map(str::to_string);

            let resolution = self.generate_icon(&request).await;
            suppressed.extend(resolution.suppressed);
            if let Some(first) = resolution.icons.into_iter().next() {
                if seen.insert((first.source.clone(), first.name.clone())) {
                    icons.push(first);
                }
            }
        }

        // Pad with stock records under fresh names.
        let base = synthesize_name(category);
        let mut index = 1;
        while icons.len() < count {
            let name = format!("{}{}", base, index);
            index += 1;
            let record = stock_icon(category, &name, style);
            if seen.insert((record.source.clone(), record.name.clone())) {
                icons.push(record);
            }
        }

        self.notifier
            .stage_resolved(Stage::Enumeration, category, icons.len());
        Resolution { icons, suppressed }
    }

    /// Ask a text provider for `count` icon names in `category`.
    async fn enumerate(
        &self,
        category: &str,
        count: usize,
        model: Option<&str>,
    ) -> Result<Vec<String>, SuppressedFailure> {
        let stage = Stage::Enumeration.as_str();
        let provider = self.choose_provider(model, stage)?;
        if provider.kind() != ProviderKind::Text {
            return Err(SuppressedFailure::new(
                stage,
                provider.name(),
                "image providers cannot enumerate names",
            ));
        }

        let reply = provider
            .complete(CATEGORY_SYSTEM_PROMPT, &category_prompt(category, count))
            .await
            .map_err(|e| SuppressedFailure::new(stage, provider.name(), e))?;
        Ok(parse_keyword_list(&reply, count))
    }
}

// ============ prompts ============

/// Geometry and paint conventions of each style.
fn style_traits(style: IconStyle) -> &'static str {
    match style {
        IconStyle::ElementPlus => {
            "Element Plus: viewBox=\"0 0 1024 1024\", solid shapes painted with \
             fill=\"currentColor\", no strokes, softly rounded geometric forms"
        }
        IconStyle::AntDesign => {
            "Ant Design: viewBox=\"64 64 896 896\", outlines drawn as filled paths with \
             fill=\"currentColor\", crisp straight edges and even line weight"
        }
        IconStyle::Default => {
            "line icon: viewBox=\"0 0 24 24\", fill=\"none\", stroke=\"currentColor\", \
             stroke-width=\"2\", round caps and joins"
        }
    }
}

/// Prompt for SVG markup synthesis.
pub fn svg_prompt(description: &str, style: IconStyle) -> String {
    format!(
        "Draw an icon for: {description}\n\
         Style: {traits}.\n\
         Use a single color and only simple shapes (path, circle, rect, line, polyline). \
         Keep the viewBox fixed as given. No text, gradients, filters or embedded images.",
        traits = style_traits(style)
    )
}

fn image_prompt(description: &str, style: IconStyle) -> String {
    format!(
        "A flat single-color UI icon of {description}, {traits}, centered on a plain white background",
        traits = style_traits(style)
    )
}

/// Wrap a generated image URL so the record still carries SVG markup.
pub fn wrap_image_url(url: &str) -> String {
    let href = url
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;");
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1024 1024\"><image href=\"{}\" width=\"1024\" height=\"1024\"/></svg>",
        href
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_style_conventions() {
        let prompt = svg_prompt("a trash can", IconStyle::AntDesign);
        assert!(prompt.contains("a trash can"));
        assert!(prompt.contains("64 64 896 896"));
        assert!(svg_prompt("x", IconStyle::Default).contains("0 0 24 24"));
    }

    #[test]
    fn image_url_is_escaped_into_markup() {
        let svg = wrap_image_url("https://img.example/a.png?x=1&y=\"2\"");
        assert!(svg.contains("href=\"https://img.example/a.png?x=1&amp;y=&quot;2&quot;\""));
        assert!(is_plausible_svg(&svg));
    }
}
