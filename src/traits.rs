//! Tool extension system.
//!
//! Every operation the gateway exposes to agents is a [`Tool`]: the HTTP
//! `POST /tools/{name}` route and the MCP bridge both dispatch through a
//! [`ToolRegistry`]. Custom tools can be registered next to the built-ins.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  search_icons   generate_icon            │
//! │  search_icons_by_category   sources      │
//! │  + custom (Rust)                         │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!        IconService (via ToolContext)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use icon_gateway::traits::ToolRegistry;
//!
//! let mut tools = ToolRegistry::with_builtins();
//! // tools.register(Box::new(MyTool::new()));
//! assert_eq!(tools.len(), 4);
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::models::{GenerationRequest, IconStyle, Resolution, SearchQuery, SubFormat};
use crate::pipeline::IconService;
use crate::present::to_table;
use crate::sources::get_sources;

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A tool that agents can discover and call.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use icon_gateway::traits::{Tool, ToolContext};
///
/// pub struct FamilyCountTool;
///
/// #[async_trait]
/// impl Tool for FamilyCountTool {
///     fn name(&self) -> &str { "family_count" }
///     fn description(&self) -> &str { "Count configured icon families" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {} })
///     }
///
///     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
///         Ok(json!({ "families": ctx.service().libraries().iter().count() }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route path segment and MCP tool name, e.g. `"generate_icon"`.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Built-in tools are marked `"builtin": true` in `GET /tools/list`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema of the parameters object.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `params` has already passed [`validate_params`].
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Serializable tool info for the `/tools/list` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

/// Check `params` against a tool schema: required keys, primitive types and
/// enums. Missing optional keys receive their schema default.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("parameters must be a JSON object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for field in required {
        if !params_obj.contains_key(field) {
            bail!("missing required parameter: {}", field);
        }
    }

    let mut result = params_obj.clone();
    for (prop_name, prop_schema) in &properties {
        let Some(value) = params_obj.get(prop_name) else {
            if let Some(default) = prop_schema.get("default") {
                result.insert(prop_name.clone(), default.clone());
            }
            continue;
        };

        if let Some(expected) = prop_schema.get("type").and_then(|t| t.as_str()) {
            let type_ok = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !type_ok {
                bail!(
                    "parameter '{}' must be of type '{}', got {}",
                    prop_name,
                    expected,
                    json_type_name(value)
                );
            }
        }

        if let Some(allowed) = prop_schema.get("enum").and_then(|e| e.as_array()) {
            if !allowed.contains(value) {
                let allowed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                bail!(
                    "parameter '{}' is invalid: must be one of [{}], got {}",
                    prop_name,
                    allowed.join(", "),
                    value
                );
            }
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// What a tool can reach while executing: the shared [`IconService`].
#[derive(Clone)]
pub struct ToolContext {
    service: Arc<IconService>,
}

impl ToolContext {
    pub fn new(service: Arc<IconService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &IconService {
        &self.service
    }
}

/// Tool result shape shared by the icon tools.
///
/// ```json
/// { "icons": [ …IconRecord… ], "table": "| source | name | svg |…", "suppressed": 0 }
/// ```
pub fn resolution_json(resolution: &Resolution) -> Value {
    json!({
        "icons": resolution.icons,
        "table": to_table(&resolution.icons),
        "suppressed": resolution.suppressed.len(),
    })
}

fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params[key]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn style_param(params: &Value) -> IconStyle {
    str_param(params, "style")
        .map(IconStyle::parse)
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

/// Library lookup by name. Delegates to [`IconService::search_icons`].
pub struct SearchIconsTool;

#[async_trait]
impl Tool for SearchIconsTool {
    fn name(&self) -> &str {
        "search_icons"
    }

    fn description(&self) -> &str {
        "Find icons by name in the Element Plus and Ant Design icon libraries"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "names": { "type": "string", "description": "Comma-separated icon names, e.g. \"delete,edit\"" },
                "style": { "type": "string", "description": "element-plus, ant-design or default (both)" },
                "format": { "type": "string", "enum": ["outlined", "filled"], "description": "Ant Design sub-format" },
                "local": { "type": "boolean", "description": "Read the local icon tree instead of the remote listing" },
                "exact": { "type": "boolean", "default": false },
                "fallback": { "type": "boolean", "default": false, "description": "Search the keyword index when no library matches" }
            },
            "required": ["names"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let names = SearchQuery::parse_names(params["names"].as_str().unwrap_or(""));
        let query = SearchQuery {
            style: str_param(&params, "style").map(IconStyle::parse),
            format: str_param(&params, "format").and_then(SubFormat::parse),
            local: params["local"].as_bool(),
            exact: params["exact"].as_bool().unwrap_or(false),
            fallback: params["fallback"].as_bool().unwrap_or(false),
            ..SearchQuery::new(names)
        };

        let resolution = ctx.service().search_icons(&query).await;
        Ok(resolution_json(&resolution))
    }
}

/// Cascading resolution of a description. Delegates to [`IconService::generate_icon`].
pub struct GenerateIconTool;

#[async_trait]
impl Tool for GenerateIconTool {
    fn name(&self) -> &str {
        "generate_icon"
    }

    fn description(&self) -> &str {
        "Get an SVG icon for a description: library match, AI generation, icon search, then a stock glyph"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": { "type": "string", "description": "What the icon should show" },
                "style": { "type": "string", "description": "element-plus, ant-design or default" },
                "model": { "type": "string", "description": "Provider name, e.g. openai, kimi, dalle" },
                "name": { "type": "string", "description": "Icon name used for the library lookup" }
            },
            "required": ["description"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let Some(description) = str_param(&params, "description") else {
            bail!("description must not be empty");
        };

        let request = GenerationRequest {
            description: description.to_string(),
            style: style_param(&params),
            model: str_param(&params, "model").map(str::to_string),
            name: str_param(&params, "name").map(str::to_string),
        };

        let resolution = ctx.service().generate_icon(&request).await;
        Ok(resolution_json(&resolution))
    }
}

/// Category expansion. Delegates to [`IconService::search_icons_by_category`].
pub struct SearchIconsByCategoryTool;

#[async_trait]
impl Tool for SearchIconsByCategoryTool {
    fn name(&self) -> &str {
        "search_icons_by_category"
    }

    fn description(&self) -> &str {
        "Get a set of icons for a broad category such as \"office\" or \"weather\""
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": { "type": "string" },
                "count": { "type": "integer", "description": "Number of icons (1-50)" },
                "style": { "type": "string", "description": "element-plus, ant-design or default" },
                "model": { "type": "string", "description": "Provider used to enumerate names" }
            },
            "required": ["category"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let Some(category) = str_param(&params, "category") else {
            bail!("category must not be empty");
        };
        let count = params["count"].as_u64().map(|c| c as usize);

        let resolution = ctx
            .service()
            .search_icons_by_category(
                category,
                count,
                style_param(&params),
                str_param(&params, "model"),
            )
            .await;
        Ok(resolution_json(&resolution))
    }
}

/// Family and provider availability. Delegates to [`get_sources`].
pub struct SourcesTool;

#[async_trait]
impl Tool for SourcesTool {
    fn name(&self) -> &str {
        "sources"
    }

    fn description(&self) -> &str {
        "List icon families, the keyword index and generative providers with their availability"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        Ok(json!({ "sources": get_sources(ctx.service()) }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry holding the four built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchIconsTool));
        registry.register(Box::new(GenerateIconTool));
        registry.register(Box::new(SearchIconsByCategoryTool));
        registry.register(Box::new(SourcesTool));
        registry
    }

    /// Register a tool. Lookup returns the first tool registered under a name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
