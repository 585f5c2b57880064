//! # Icon Gateway
//!
//! SVG icon lookup and generation behind one stateless pipeline.
//!
//! Given a name or a free-text description, the gateway answers with SVG
//! markup taken from the Element Plus and Ant Design icon libraries (local
//! trees or the GitHub contents API), produced by a generative model, found in
//! an Iconify-compatible search index, or, as a last resort, drawn from a
//! small stock set.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌────────┐
//! │  Libraries │─▶│ Generation │─▶│  Keyword   │─▶│ Stock  │
//! │ EP / Antd  │  │ providers  │  │   index    │  │  SVG   │
//! └────────────┘  └────────────┘  └────────────┘  └────────┘
//!        first stage with records wins ── IconService
//!                      │
//!        ┌─────────────┼──────────────┐
//!        ▼             ▼              ▼
//!   ┌─────────┐  ┌──────────┐  ┌────────────┐
//!   │   CLI   │  │ HTTP API │  │ MCP (/mcp) │
//!   │(icongw) │  │  + tools │  │            │
//!   └─────────┘  └──────────┘  └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! icongw search delete,edit          # library lookup
//! icongw generate "a paper plane"    # cascading resolution
//! icongw category weather --count 6  # category expansion
//! icongw serve                       # HTTP + MCP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | Search-key normalization and name synthesis |
//! | [`svg`] | SVG canonicalization |
//! | [`keywords`] | Keyword extraction and category prompts |
//! | [`library`] | Icon library adapters |
//! | [`keyword_index`] | Iconify search fallback |
//! | [`provider`] | Generative model providers |
//! | [`stock`] | Stock SVG fallback |
//! | [`notify`] | Stage notifications |
//! | [`pipeline`] | `IconService`: search, generate, category |
//! | [`present`] | De-duplication and table rendering |
//! | [`traits`] | Tool trait and registry |
//! | [`server`] | HTTP server |
//! | [`mcp`] | MCP bridge |
//! | [`sources`] | Availability report |

pub mod config;
pub mod keyword_index;
pub mod keywords;
pub mod library;
pub mod mcp;
pub mod models;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod present;
pub mod provider;
pub mod server;
pub mod sources;
pub mod stock;
pub mod svg;
pub mod traits;
