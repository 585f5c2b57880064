//! TOML configuration parsing and validation.
//!
//! Every section is optional; a missing section takes the defaults below.
//! Credentials never live in this file: each provider names the environment
//! variable its secret is read from (see [`crate::provider`]).
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [libraries]
//! root = "./icons"
//! prefer_local = true
//!
//! [keyword_index]
//! url = "https://api.iconify.design"
//!
//! [generation]
//! priority = ["openai", "tongyi", "zhipu", "kimi", "doubao", "wenxin"]
//!
//! [generation.providers.openai]
//! model = "gpt-4o-mini"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::provider::{builtin_spec, ProviderKind};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub libraries: LibrariesConfig,
    #[serde(default)]
    pub keyword_index: KeywordIndexConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LibrariesConfig {
    /// Local icon tree: `<root>/element-plus/*.svg`,
    /// `<root>/ant-design/outlined/*.svg`, `<root>/ant-design/filled/*.svg`.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Source flag used when a search does not say local or remote.
    #[serde(default = "default_true")]
    pub prefer_local: bool,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
    #[serde(default = "default_library_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub remote: RemoteLibrariesConfig,
}

impl Default for LibrariesConfig {
    fn default() -> Self {
        Self {
            root: None,
            prefer_local: true,
            include_globs: default_include_globs(),
            max_matches: default_max_matches(),
            timeout_secs: default_library_timeout(),
            remote: RemoteLibrariesConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_include_globs() -> Vec<String> {
    vec!["*.svg".to_string()]
}
fn default_max_matches() -> usize {
    20
}
fn default_library_timeout() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteLibrariesConfig {
    #[serde(default = "default_element_plus_url")]
    pub element_plus_url: String,
    /// Base listing URL; the sub-format directory is appended.
    #[serde(default = "default_ant_design_url")]
    pub ant_design_url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for RemoteLibrariesConfig {
    fn default() -> Self {
        Self {
            element_plus_url: default_element_plus_url(),
            ant_design_url: default_ant_design_url(),
            token_env: default_token_env(),
        }
    }
}

fn default_element_plus_url() -> String {
    "https://api.github.com/repos/element-plus/element-plus-icons/contents/packages/svg".to_string()
}
fn default_ant_design_url() -> String {
    "https://api.github.com/repos/ant-design/ant-design-icons/contents/packages/icons-svg/svg"
        .to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordIndexConfig {
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_index_limit")]
    pub limit: usize,
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

impl Default for KeywordIndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            limit: default_index_limit(),
            timeout_secs: default_index_timeout(),
        }
    }
}

fn default_index_url() -> String {
    "https://api.iconify.design".to_string()
}
fn default_index_limit() -> usize {
    5
}
fn default_index_timeout() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Provider names tried in order when a request names no model.
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    /// Category expansion count when the caller gives none.
    #[serde(default = "default_count")]
    pub default_count: usize,
    #[serde(default)]
    pub providers: HashMap<String, ProviderOverride>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            timeout_secs: default_generation_timeout(),
            default_count: default_count(),
            providers: HashMap::new(),
        }
    }
}

fn default_priority() -> Vec<String> {
    ["openai", "tongyi", "zhipu", "kimi", "doubao", "wenxin"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_generation_timeout() -> u64 {
    30
}
fn default_count() -> usize {
    8
}

/// Per-provider overrides for `[generation.providers.<name>]`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderOverride {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl Config {
    /// Configuration with every default and no local library root.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Libraries
    if config.libraries.max_matches == 0 {
        anyhow::bail!("libraries.max_matches must be > 0");
    }
    if config.libraries.timeout_secs == 0 {
        anyhow::bail!("libraries.timeout_secs must be > 0");
    }
    if config.libraries.include_globs.is_empty() {
        anyhow::bail!("libraries.include_globs must not be empty");
    }

    // Keyword index
    if !(1..=5).contains(&config.keyword_index.limit) {
        anyhow::bail!("keyword_index.limit must be in [1, 5]");
    }
    if config.keyword_index.timeout_secs == 0 {
        anyhow::bail!("keyword_index.timeout_secs must be > 0");
    }

    // Generation
    if config.generation.timeout_secs == 0 {
        anyhow::bail!("generation.timeout_secs must be > 0");
    }
    if !(1..=50).contains(&config.generation.default_count) {
        anyhow::bail!("generation.default_count must be in [1, 50]");
    }
    for name in &config.generation.priority {
        match builtin_spec(name) {
            Some(spec) if spec.kind == ProviderKind::Image => anyhow::bail!(
                "generation.priority: '{}' is an image provider and can only be selected explicitly",
                name
            ),
            Some(_) => {}
            None => anyhow::bail!("generation.priority: unknown provider '{}'", name),
        }
    }
    for name in config.generation.providers.keys() {
        if builtin_spec(name).is_none() {
            anyhow::bail!("generation.providers: unknown provider '{}'", name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_takes_defaults() {
        let config: Config = toml::from_str("").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.keyword_index.limit, 5);
        assert!(config.libraries.prefer_local);
        assert_eq!(config.generation.priority[0], "openai");
    }

    #[test]
    fn provider_override_parses() {
        let config: Config = toml::from_str(
            r#"
[generation.providers.kimi]
base_url = "http://127.0.0.1:9999/v1"
model = "moonshot-v1-32k"
"#,
        )
        .unwrap();
        validate(&config).unwrap();
        let kimi = &config.generation.providers["kimi"];
        assert_eq!(kimi.model.as_deref(), Some("moonshot-v1-32k"));
        assert!(kimi.api_key_env.is_none());
    }

    #[test]
    fn rejects_unknown_priority_entry() {
        let config: Config = toml::from_str(
            r#"
[generation]
priority = ["openai", "skynet"]
"#,
        )
        .unwrap();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("skynet"));
    }

    #[test]
    fn rejects_image_provider_in_priority() {
        let config: Config = toml::from_str(
            r#"
[generation]
priority = ["dalle"]
"#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_index_limit_above_five() {
        let config: Config = toml::from_str(
            r#"
[keyword_index]
limit = 9
"#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }
}
