//! # Icon Gateway CLI (`icongw`)
//!
//! ## Usage
//!
//! ```bash
//! icongw --config ./config/icons.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `icongw search <names>` | Look names up in the icon libraries |
//! | `icongw generate "<description>"` | Resolve a description: library, AI, index, stock |
//! | `icongw category <category>` | A set of icons for a broad category |
//! | `icongw sources` | Family and provider availability |
//! | `icongw serve` | Start the HTTP + MCP server |
//!
//! ## Examples
//!
//! ```bash
//! icongw search delete,edit --style ant-design --format outlined
//! icongw generate "红色的删除按钮" --name delete
//! icongw category office --count 5 --json
//! icongw serve --config ./config/icons.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use icon_gateway::config::{self, Config};
use icon_gateway::models::{GenerationRequest, IconStyle, Resolution, SearchQuery, SubFormat};
use icon_gateway::pipeline::IconService;
use icon_gateway::present::to_table;
use icon_gateway::{server, sources};

const DEFAULT_CONFIG: &str = "./config/icons.toml";

/// Icon Gateway: SVG icons from icon libraries, generative models, and an
/// icon search index.
#[derive(Parser)]
#[command(
    name = "icongw",
    about = "Icon Gateway — SVG icon lookup and generation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/icons.toml`; when that file does not exist the
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look icon names up in the Element Plus and Ant Design libraries.
    Search {
        /// Comma-separated icon names.
        names: String,

        /// `element-plus`, `ant-design`, or `default` (both families).
        #[arg(long)]
        style: Option<String>,

        /// Ant Design sub-format: `outlined` or `filled`.
        #[arg(long)]
        format: Option<String>,

        /// Read the local icon tree.
        #[arg(long, conflicts_with = "remote")]
        local: bool,

        /// Read the remote listing.
        #[arg(long)]
        remote: bool,

        /// Require the whole name to match.
        #[arg(long)]
        exact: bool,

        /// Query the keyword index for names no family matched.
        #[arg(long)]
        fallback: bool,

        /// Print JSON records instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Resolve a description to an icon.
    ///
    /// Tries an exact local library match, then a generative model, then the
    /// keyword index, and finally a stock glyph. Always prints one icon.
    Generate {
        description: String,

        #[arg(long, default_value = "default")]
        style: String,

        /// Provider to use instead of the configured priority order.
        #[arg(long)]
        model: Option<String>,

        /// Icon name used for the library lookup.
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Expand a broad category into a set of icons.
    Category {
        category: String,

        /// Number of icons (1-50); defaults to `generation.default_count`.
        #[arg(long)]
        count: Option<usize>,

        #[arg(long, default_value = "default")]
        style: String,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List icon families, the keyword index and providers with their status.
    Sources,

    /// Start the HTTP server (REST API, tool routes and MCP endpoint).
    Serve,
}

fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => config::load_config(path),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            config::load_config(Path::new(DEFAULT_CONFIG))
        }
        None => Ok(Config::minimal()),
    }
}

fn print_resolution(resolution: &Resolution, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&resolution.icons)?);
    } else {
        println!("{}", to_table(&resolution.icons));
    }
    if !resolution.suppressed.is_empty() {
        eprintln!(
            "{} source failure(s) suppressed (RUST_LOG=icon_gateway=debug for details)",
            resolution.suppressed.len()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("icon_gateway=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load(cli.config.as_deref())?;

    match cli.command {
        Commands::Search {
            names,
            style,
            format,
            local,
            remote,
            exact,
            fallback,
            json,
        } => {
            let format = match format.as_deref() {
                Some(f) => Some(SubFormat::parse(f).ok_or_else(|| {
                    anyhow::anyhow!("invalid format '{}': use outlined or filled", f)
                })?),
                None => None,
            };
            let query = SearchQuery {
                style: style.as_deref().map(IconStyle::parse),
                format,
                local: if local {
                    Some(true)
                } else if remote {
                    Some(false)
                } else {
                    None
                },
                exact,
                fallback,
                ..SearchQuery::new(SearchQuery::parse_names(&names))
            };
            let service = IconService::new(&cfg)?;
            let resolution = service.search_icons(&query).await;
            print_resolution(&resolution, json)?;
        }
        Commands::Generate {
            description,
            style,
            model,
            name,
            json,
        } => {
            if description.trim().is_empty() {
                anyhow::bail!("description must not be empty");
            }
            let request = GenerationRequest {
                description,
                style: IconStyle::parse(&style),
                model,
                name,
            };
            let service = IconService::new(&cfg)?;
            let resolution = service.generate_icon(&request).await;
            print_resolution(&resolution, json)?;
        }
        Commands::Category {
            category,
            count,
            style,
            model,
            json,
        } => {
            if category.trim().is_empty() {
                anyhow::bail!("category must not be empty");
            }
            let service = IconService::new(&cfg)?;
            let resolution = service
                .search_icons_by_category(
                    &category,
                    count,
                    IconStyle::parse(&style),
                    model.as_deref(),
                )
                .await;
            print_resolution(&resolution, json)?;
        }
        Commands::Sources => {
            let service = IconService::new(&cfg)?;
            sources::list_sources(&service)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
