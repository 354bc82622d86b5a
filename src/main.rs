mod commands;
#[cfg(feature = "mcp")]
mod mcp;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::CommandContext;

#[derive(Parser)]
#[command(name = "catalog-rag")]
#[command(about = "Product catalog retrieval with semantic search and keyword fallback", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Path to a TOML settings file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Skip the vector backend and use keyword search")]
    fallback: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a catalog file into the active store
    Index {
        #[arg(long, short, help = "JSON catalog file")]
        catalog: PathBuf,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Ranked product search
    Search {
        query: String,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, short, help = "Index this catalog before searching")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Answer a question from the catalog
    Query {
        query: String,
        #[arg(long, short = 'k', help = "Number of products to retrieve")]
        top_k: Option<usize>,
        #[arg(long, short, help = "Index this catalog before querying")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show retrieval mode and index state
    Status {
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== MCP Server =====
    /// Start MCP server
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, short, help = "Index this catalog at startup")]
        catalog: Option<PathBuf>,
    },
}

fn init_tracing() {
    // stderr keeps stdout clean for JSON output and the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let ctx = CommandContext::load(cli.config.as_deref(), cli.fallback)?;
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Index { catalog, json } => commands::index::run(&ctx, &catalog, json).await,
            Commands::Search {
                query,
                limit,
                catalog,
                json,
            } => commands::search::run(&ctx, &query, limit, catalog.as_ref(), json).await,
            Commands::Query {
                query,
                top_k,
                catalog,
                json,
            } => commands::query::run(&ctx, &query, top_k, catalog.as_ref(), json).await,
            Commands::Status { json } => commands::status::run(&ctx, json).await,

            #[cfg(feature = "mcp")]
            Commands::Mcp { catalog } => mcp::run_mcp_server(&ctx, catalog.as_ref()).await,
        }
    })
}
