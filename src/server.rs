//! HTTP server.
//!
//! A thin JSON façade over [`IconService`] plus the tool registry and the
//! MCP endpoint. Every handler delegates to the same core calls the CLI uses.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/icons/search` | `?name=` or `?names=a,b`, `&style=&format=&local=&exact=&fallback=` |
//! | `POST` | `/api/icons/generate` | `{ "description", "style"?, "model"?, "name"? }` |
//! | `GET`  | `/api/icons/category` | `?category=&count=&style=&model=` |
//! | `GET`  | `/tools/list` | List registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a registered tool |
//! | `*`    | `/mcp` | MCP Streamable HTTP endpoint |
//!
//! The `/api/icons/*` routes answer with a JSON array of icon records.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "description must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `tool_error` (500).
//! Source failures inside a resolution are never errors; they only lower the
//! quality of the answer.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::mcp::McpBridge;
use crate::models::{GenerationRequest, IconRecord, IconStyle, SearchQuery, SubFormat};
use crate::pipeline::IconService;
use crate::traits::{validate_params, ToolContext, ToolInfo, ToolRegistry};

#[derive(Clone)]
struct AppState {
    ctx: ToolContext,
    tools: Arc<ToolRegistry>,
}

/// Build the service from `config` and serve until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(IconService::new(config)?);
    run_server_with_extensions(config, service, ToolRegistry::with_builtins()).await
}

/// Serve with a prepared service and a caller-supplied tool registry.
pub async fn run_server_with_extensions(
    config: &Config,
    service: Arc<IconService>,
    tools: ToolRegistry,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    for t in tools.tools() {
        let tag = if t.is_builtin() { "builtin" } else { "rust" };
        tracing::debug!(tool = t.name(), kind = tag, "registered tool");
    }

    let app = router(service, Arc::new(tools));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("icon gateway listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// The complete route table, MCP endpoint included.
pub fn router(service: Arc<IconService>, tools: Arc<ToolRegistry>) -> Router {
    let ctx = ToolContext::new(service);

    let bridge = McpBridge::new(ctx.clone(), tools.clone());
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/icons/search", get(handle_search))
        .route("/api/icons/generate", post(handle_generate))
        .route("/api/icons/category", get(handle_category))
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .nest_service("/mcp", mcp_service)
        .layer(cors)
        .with_state(AppState { ctx, tools })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error",
        message: message.into(),
    }
}

/// Tool errors signal client mistakes by message; everything else is a 500.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let msg = format!("{}: {}", tool_name, err);
    if msg.contains("not found") {
        not_found(msg)
    } else if msg.contains("must not be empty") || msg.contains("invalid") {
        bad_request(msg)
    } else {
        tool_error(msg)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/icons/search ============

#[derive(Debug, Deserialize)]
struct SearchParams {
    name: Option<String>,
    names: Option<String>,
    style: Option<String>,
    format: Option<String>,
    local: Option<bool>,
    exact: Option<bool>,
    fallback: Option<bool>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<IconRecord>>, AppError> {
    let raw = params
        .names
        .or(params.name)
        .ok_or_else(|| bad_request("name or names is required"))?;

    let format = match params.format.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(f) => Some(
            SubFormat::parse(f)
                .ok_or_else(|| bad_request(format!("format is invalid: {}", f)))?,
        ),
    };

    let query = SearchQuery {
        style: params.style.as_deref().map(IconStyle::parse),
        format,
        local: params.local,
        exact: params.exact.unwrap_or(false),
        fallback: params.fallback.unwrap_or(false),
        ..SearchQuery::new(SearchQuery::parse_names(&raw))
    };

    let resolution = state.ctx.service().search_icons(&query).await;
    Ok(Json(resolution.icons))
}

// ============ POST /api/icons/generate ============

#[derive(Debug, Deserialize)]
struct GenerateBody {
    description: String,
    style: Option<String>,
    model: Option<String>,
    name: Option<String>,
}

async fn handle_generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<Vec<IconRecord>>, AppError> {
    if body.description.trim().is_empty() {
        return Err(bad_request("description must not be empty"));
    }

    let request = GenerationRequest {
        description: body.description,
        style: body.style.as_deref().map(IconStyle::parse).unwrap_or_default(),
        model: body.model.filter(|m| !m.trim().is_empty()),
        name: body.name.filter(|n| !n.trim().is_empty()),
    };

    let resolution = state.ctx.service().generate_icon(&request).await;
    Ok(Json(resolution.icons))
}

// ============ GET /api/icons/category ============

#[derive(Debug, Deserialize)]
struct CategoryParams {
    category: Option<String>,
    count: Option<usize>,
    style: Option<String>,
    model: Option<String>,
}

async fn handle_category(
    State(state): State<AppState>,
    Query(params): Query<CategoryParams>,
) -> Result<Json<Vec<IconRecord>>, AppError> {
    let category = params.category.unwrap_or_default();
    if category.trim().is_empty() {
        return Err(bad_request("category must not be empty"));
    }

    let style = params.style.as_deref().map(IconStyle::parse).unwrap_or_default();
    let model = params.model.as_deref().filter(|m| !m.trim().is_empty());

    let resolution = state
        .ctx
        .service()
        .search_icons_by_category(&category, params.count, style, model)
        .await;
    Ok(Json(resolution.icons))
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let tools = state
        .tools
        .tools()
        .iter()
        .map(|t| ToolInfo::from_tool(t.as_ref()))
        .collect();
    Json(ToolListResponse { tools })
}

// ============ POST /tools/{name} ============

/// Unified tool dispatch: 404 for an unknown tool, 400 for parameter errors,
/// 500 for execution errors.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let params = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| bad_request(e.to_string()))?;

    let result = tool
        .execute(params, &state.ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}
