//! Generative model provider abstraction and implementations.
//!
//! Defines the [`ModelProvider`] trait and two concrete adapters:
//! - **[`ChatCompletionProvider`]** — OpenAI-compatible `POST /chat/completions`;
//!   used for SVG markup synthesis and category enumeration.
//! - **[`ImageGenerationProvider`]** — OpenAI-compatible `POST /images/generations`;
//!   returns an image URL and is only reachable by explicit selection.
//!
//! # Built-in providers
//!
//! | Name | Kind | Credential | Default base URL |
//! |------|------|------------|------------------|
//! | `openai` | text | `OPENAI_API_KEY` | `https://api.openai.com/v1` |
//! | `tongyi` | text | `DASHSCOPE_API_KEY` | `https://dashscope.aliyuncs.com/compatible-mode/v1` |
//! | `wenxin` | text | `QIANFAN_API_KEY` | `https://qianfan.baidubce.com/v2` |
//! | `zhipu` | text | `ZHIPU_API_KEY` | `https://open.bigmodel.cn/api/paas/v4` |
//! | `kimi` | text | `MOONSHOT_API_KEY` | `https://api.moonshot.cn/v1` |
//! | `doubao` | text | `ARK_API_KEY` | `https://ark.cn-beijing.volces.com/api/v3` |
//! | `dalle` | image | `OPENAI_API_KEY` | `https://api.openai.com/v1` |
//!
//! # Selection
//!
//! [`select_provider`] is a pure function over the registry: an explicit name
//! wins; otherwise the first text provider in priority order whose credential
//! is present. No network call happens during selection.
//!
//! # Failure taxonomy
//!
//! - missing credential → [`ProviderError::MissingCredential`], no request sent
//! - HTTP 401 → [`ProviderError::Unauthorized`], naming the env var
//! - HTTP 400 → [`ProviderError::BadRequest`], with the provider's detail
//! - other status / network / timeout → [`ProviderError::Status`] or [`ProviderError::Transport`]

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{GenerationConfig, ProviderOverride};
use crate::svg::strip_code_fences;

/// System instruction constraining markup synthesis to bare SVG.
pub const SVG_SYSTEM_PROMPT: &str = "You are an SVG icon generator. Reply with one complete \
<svg>...</svg> element and nothing else: no prose, no explanation, no Markdown code block.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Returns text (SVG markup or a keyword list).
    Text,
    /// Returns an image URL.
    Image,
}

/// Static description of a built-in provider.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinSpec {
    pub name: &'static str,
    pub kind: ProviderKind,
    pub api_key_env: &'static str,
    pub base_url: &'static str,
    pub model: &'static str,
}

const BUILTINS: &[BuiltinSpec] = &[
    BuiltinSpec {
        name: "openai",
        kind: ProviderKind::Text,
        api_key_env: "OPENAI_API_KEY",
        base_url: "https://api.openai.com/v1",
        model: "gpt-4o-mini",
    },
    BuiltinSpec {
        name: "tongyi",
        kind: ProviderKind::Text,
        api_key_env: "DASHSCOPE_API_KEY",
        base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1",
        model: "qwen-plus",
    },
    BuiltinSpec {
        name: "wenxin",
        kind: ProviderKind::Text,
        api_key_env: "QIANFAN_API_KEY",
        base_url: "https://qianfan.baidubce.com/v2",
        model: "ernie-4.0-8k",
    },
    BuiltinSpec {
        name: "zhipu",
        kind: ProviderKind::Text,
        api_key_env: "ZHIPU_API_KEY",
        base_url: "https://open.bigmodel.cn/api/paas/v4",
        model: "glm-4-flash",
    },
    BuiltinSpec {
        name: "kimi",
        kind: ProviderKind::Text,
        api_key_env: "MOONSHOT_API_KEY",
        base_url: "https://api.moonshot.cn/v1",
        model: "moonshot-v1-8k",
    },
    BuiltinSpec {
        name: "doubao",
        kind: ProviderKind::Text,
        api_key_env: "ARK_API_KEY",
        base_url: "https://ark.cn-beijing.volces.com/api/v3",
        model: "doubao-pro-32k",
    },
    BuiltinSpec {
        name: "dalle",
        kind: ProviderKind::Image,
        api_key_env: "OPENAI_API_KEY",
        base_url: "https://api.openai.com/v1",
        model: "dall-e-3",
    },
];

/// Look up a built-in provider by name.
pub fn builtin_spec(name: &str) -> Option<&'static BuiltinSpec> {
    BUILTINS.iter().find(|spec| spec.name == name)
}

/// Names of every built-in provider, in table order.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|spec| spec.name)
}

/// Resolved settings of one provider instance.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub name: String,
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Builtin defaults with config overrides applied; the credential is
    /// read from the environment here, once.
    pub fn resolve(
        spec: &BuiltinSpec,
        overrides: Option<&ProviderOverride>,
        timeout: Duration,
    ) -> Self {
        let api_key_env = overrides
            .and_then(|o| o.api_key_env.clone())
            .unwrap_or_else(|| spec.api_key_env.to_string());
        let api_key = std::env::var(&api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        Self {
            name: spec.name.to_string(),
            kind: spec.kind,
            base_url: overrides
                .and_then(|o| o.base_url.clone())
                .unwrap_or_else(|| spec.base_url.to_string()),
            model: overrides
                .and_then(|o| o.model.clone())
                .unwrap_or_else(|| spec.model.to_string()),
            api_key_env,
            api_key,
            timeout,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider}: credential not configured (set {env})")]
    MissingCredential { provider: String, env: String },

    #[error("{provider}: authentication failed, check {env}")]
    Unauthorized { provider: String, env: String },

    #[error("{provider}: bad request: {detail}")]
    BadRequest { provider: String, detail: String },

    #[error("{provider}: API error {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: request failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider}: response carried no content")]
    EmptyResponse { provider: String },
}

/// A generative backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider tag (e.g. `"openai"`), also written into records it produces.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Whether the credential is present. Never touches the network.
    fn has_credential(&self) -> bool;

    /// Environment variable the credential is read from, if any.
    fn credential_env(&self) -> Option<&str> {
        None
    }

    /// One completion under the given system instruction. Residual code
    /// fences are stripped from text replies.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError>;

    /// SVG markup (text providers) or an image URL (image providers).
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.complete(SVG_SYSTEM_PROMPT, prompt).await
    }
}

// ============ Chat completion provider ============

/// OpenAI-compatible chat completion adapter.
pub struct ChatCompletionProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl ChatCompletionProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let client = build_client(settings.timeout)?;
        Ok(Self { settings, client })
    }
}

#[async_trait]
impl ModelProvider for ChatCompletionProvider {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Text
    }

    fn has_credential(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn credential_env(&self) -> Option<&str> {
        Some(&self.settings.api_key_env)
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "temperature": 0.2,
        });

        let json = post_json(&self.client, &self.settings, "chat/completions", &body).await?;

        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(strip_code_fences)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: self.settings.name.clone(),
            })?;

        Ok(content)
    }
}

// ============ Image generation provider ============

/// OpenAI-compatible image generation adapter. Ignores the system instruction.
pub struct ImageGenerationProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl ImageGenerationProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let client = build_client(settings.timeout)?;
        Ok(Self { settings, client })
    }
}

#[async_trait]
impl ModelProvider for ImageGenerationProvider {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Image
    }

    fn has_credential(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn credential_env(&self) -> Option<&str> {
        Some(&self.settings.api_key_env)
    }

    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
        });

        let json = post_json(&self.client, &self.settings, "images/generations", &body).await?;

        json.pointer("/data/0/url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: self.settings.name.clone(),
            })
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("icon-gateway/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Single authenticated POST with the shared failure mapping.
async fn post_json(
    client: &reqwest::Client,
    settings: &ProviderSettings,
    path: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ProviderError> {
    let api_key = settings
        .api_key
        .as_ref()
        .ok_or_else(|| ProviderError::MissingCredential {
            provider: settings.name.clone(),
            env: settings.api_key_env.clone(),
        })?;

    let url = format!("{}/{}", settings.base_url.trim_end_matches('/'), path);
    let transport = |source| ProviderError::Transport {
        provider: settings.name.clone(),
        source,
    };

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(transport)?;

    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(transport);
    }

    let body_text = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        401 => ProviderError::Unauthorized {
            provider: settings.name.clone(),
            env: settings.api_key_env.clone(),
        },
        400 => ProviderError::BadRequest {
            provider: settings.name.clone(),
            detail: error_detail(&body_text),
        },
        code => ProviderError::Status {
            provider: settings.name.clone(),
            status: code,
            body: body_text,
        },
    })
}

/// `error.message` from an OpenAI-style error body, else the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .or_else(|| json.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

// ============ Registry ============

/// Every configured provider plus the automatic-selection priority.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ModelProvider>>,
    priority: Vec<String>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn ModelProvider>>, priority: Vec<String>) -> Self {
        Self {
            providers,
            priority,
        }
    }

    /// Instantiate every built-in provider with config overrides applied.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let providers = BUILTINS
            .iter()
            .map(|spec| {
                let settings =
                    ProviderSettings::resolve(spec, config.providers.get(spec.name), timeout);
                let provider: Arc<dyn ModelProvider> = match spec.kind {
                    ProviderKind::Text => Arc::new(ChatCompletionProvider::new(settings)?),
                    ProviderKind::Image => Arc::new(ImageGenerationProvider::new(settings)?),
                };
                Ok(provider)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(providers, config.priority.clone()))
    }

    pub fn providers(&self) -> &[Arc<dyn ModelProvider>] {
        &self.providers
    }

    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    pub fn select(&self, explicit: Option<&str>) -> Option<Arc<dyn ModelProvider>> {
        select_provider(&self.providers, &self.priority, explicit).cloned()
    }
}

/// Choose a provider.
///
/// An explicit name returns that provider whether or not its credential is
/// present (the adapter then fails fast). Without one, the first text
/// provider in `priority` with a credential wins; `None` means the generation
/// path is unavailable.
pub fn select_provider<'a>(
    providers: &'a [Arc<dyn ModelProvider>],
    priority: &[String],
    explicit: Option<&str>,
) -> Option<&'a Arc<dyn ModelProvider>> {
    let by_name = |name: &str| providers.iter().find(|p| p.name() == name);

    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return by_name(&name.to_lowercase());
    }

    priority
        .iter()
        .filter_map(|name| by_name(name.as_str()))
        .find(|p| p.kind() == ProviderKind::Text && p.has_credential())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider {
        name: &'static str,
        kind: ProviderKind,
        credential: bool,
    }

    #[async_trait]
    impl ModelProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }
        fn kind(&self) -> ProviderKind {
            self.kind
        }
        fn has_credential(&self) -> bool {
            self.credential
        }
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ProviderError> {
            Ok(String::new())
        }
    }

    fn fake(name: &'static str, kind: ProviderKind, credential: bool) -> Arc<dyn ModelProvider> {
        Arc::new(FakeProvider {
            name,
            kind,
            credential,
        })
    }

    fn priority(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_credentialed_provider_in_priority_wins() {
        let providers = vec![
            fake("openai", ProviderKind::Text, false),
            fake("kimi", ProviderKind::Text, true),
            fake("zhipu", ProviderKind::Text, true),
        ];
        let chosen = select_provider(&providers, &priority(&["openai", "zhipu", "kimi"]), None);
        assert_eq!(chosen.unwrap().name(), "zhipu");
    }

    #[test]
    fn no_credentials_means_unavailable() {
        let providers = vec![
            fake("openai", ProviderKind::Text, false),
            fake("kimi", ProviderKind::Text, false),
        ];
        assert!(select_provider(&providers, &priority(&["openai", "kimi"]), None).is_none());
    }

    #[test]
    fn image_providers_are_never_picked_automatically() {
        let providers = vec![fake("dalle", ProviderKind::Image, true)];
        assert!(select_provider(&providers, &priority(&["dalle"]), None).is_none());
        let explicit = select_provider(&providers, &[], Some("dalle"));
        assert_eq!(explicit.unwrap().name(), "dalle");
    }

    #[test]
    fn explicit_name_bypasses_credential_check() {
        let providers = vec![
            fake("openai", ProviderKind::Text, false),
            fake("kimi", ProviderKind::Text, true),
        ];
        let chosen = select_provider(&providers, &priority(&["kimi"]), Some(" OpenAI "));
        assert_eq!(chosen.unwrap().name(), "openai");
        assert!(select_provider(&providers, &[], Some("unknown")).is_none());
        // Blank explicit value falls back to the priority order.
        let chosen = select_provider(&providers, &priority(&["kimi"]), Some(" "));
        assert_eq!(chosen.unwrap().name(), "kimi");
    }

    #[test]
    fn error_detail_prefers_message_field() {
        assert_eq!(
            error_detail(r#"{"error":{"message":"model not found","type":"x"}}"#),
            "model not found"
        );
        assert_eq!(error_detail("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn missing_credential_fails_without_network() {
        let settings = ProviderSettings {
            name: "openai".to_string(),
            kind: ProviderKind::Text,
            // Unroutable: a request would fail differently.
            base_url: "http://127.0.0.1:9".to_string(),
            model: "m".to_string(),
            api_key_env: "ICON_GATEWAY_TEST_NO_SUCH_KEY".to_string(),
            api_key: None,
            timeout: Duration::from_secs(1),
        };
        let provider = ChatCompletionProvider::new(settings).unwrap();
        assert!(!provider.has_credential());
        let err = provider.generate("a star").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential { .. }));
        assert!(err.to_string().contains("ICON_GATEWAY_TEST_NO_SUCH_KEY"));
    }

    #[test]
    fn registry_builds_every_builtin_with_its_timeout() {
        let config = GenerationConfig {
            timeout_secs: 7,
            ..GenerationConfig::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        let names: Vec<&str> = registry.providers().iter().map(|p| p.name()).collect();
        assert_eq!(names, builtin_names().collect::<Vec<_>>());
        assert_eq!(registry.priority(), config.priority.as_slice());
    }

    #[test]
    fn overrides_apply_to_builtin_defaults() {
        let spec = builtin_spec("kimi").unwrap();
        let overrides = ProviderOverride {
            base_url: Some("http://localhost:1234/v1".to_string()),
            model: None,
            api_key_env: Some("ICON_GATEWAY_TEST_UNSET_KEY".to_string()),
        };
        let settings = ProviderSettings::resolve(spec, Some(&overrides), Duration::from_secs(5));
        assert_eq!(settings.base_url, "http://localhost:1234/v1");
        assert_eq!(settings.model, "moonshot-v1-8k");
        assert_eq!(settings.api_key_env, "ICON_GATEWAY_TEST_UNSET_KEY");
        assert!(settings.api_key.is_none());
    }
}
