//! KimDB CLI
//!
//! Command-line client for a KimDB server.
//!
//! # Commands
//!
//! - `health`, `metrics` - Server status
//! - `collections` - List collection names
//! - `list`, `get` - Read documents
//! - `sql`, `count`, `group-by` - Run queries
//! - `watch` - Stream realtime events for a collection or document

mod commands;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// KimDB command-line client.
#[derive(Parser)]
#[command(name = "kimdb")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Server base URL
    #[arg(global = true, long, env = "KIMDB_URL", default_value = "http://localhost:40000")]
    url: String,

    /// Realtime endpoint (derived from --url when omitted)
    #[arg(global = true, long, env = "KIMDB_WS_URL")]
    ws_url: Option<String>,

    /// Bearer token
    #[arg(global = true, long, env = "KIMDB_TOKEN")]
    token: Option<String>,

    /// API key (ignored when a token is set)
    #[arg(global = true, long, env = "KIMDB_API_KEY")]
    api_key: Option<String>,

    /// Per-attempt request timeout in seconds
    #[arg(global = true, long, env = "KIMDB_TIMEOUT", default_value = "30")]
    timeout: u64,

    /// Retries after the first failed attempt
    #[arg(global = true, long, env = "KIMDB_RETRIES", default_value = "3")]
    retries: u32,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server health
    Health,

    /// Show server metrics
    Metrics,

    /// List collection names
    Collections,

    /// List documents in a collection
    List {
        /// Collection name
        collection: String,

        /// Maximum number of documents
        #[arg(short, long)]
        limit: Option<u64>,

        /// Number of documents to skip
        #[arg(short, long)]
        skip: Option<u64>,

        /// Field to sort by
        #[arg(long)]
        sort: Option<String>,
    },

    /// Fetch one document
    Get {
        /// Collection name
        collection: String,

        /// Document ID
        id: String,
    },

    /// Run a SQL statement against a collection
    Sql {
        /// Collection name
        collection: String,

        /// SQL text
        sql: String,

        /// Positional parameter (JSON, or a bare string)
        #[arg(short, long = "param", value_parser = commands::query::parse_param)]
        params: Vec<Value>,
    },

    /// Count documents
    Count {
        /// Collection name
        collection: String,

        /// WHERE clause without the keyword
        #[arg(short = 'w', long = "where")]
        condition: Option<String>,
    },

    /// Count documents per distinct field value
    GroupBy {
        /// Collection name
        collection: String,

        /// Field to group by
        field: String,
    },

    /// Stream realtime events until the connection closes
    Watch {
        /// Collection name
        collection: String,

        /// Watch a single document instead of the whole collection
        #[arg(short, long)]
        doc: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays machine-readable
    let filter = log_filter(cli.verbose, std::env::var("RUST_LOG").ok());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Health => commands::server::health(&cli)?,
        Commands::Metrics => commands::server::metrics(&cli)?,
        Commands::Collections => commands::server::collections(&cli)?,
        Commands::List {
            collection,
            limit,
            skip,
            sort,
        } => commands::documents::list(&cli, collection, *limit, *skip, sort.as_deref())?,
        Commands::Get { collection, id } => commands::documents::get(&cli, collection, id)?,
        Commands::Sql {
            collection,
            sql,
            params,
        } => commands::query::sql(&cli, collection, sql, params)?,
        Commands::Count {
            collection,
            condition,
        } => commands::query::count(&cli, collection, condition.as_deref())?,
        Commands::GroupBy { collection, field } => {
            commands::query::group_by(&cli, collection, field)?
        }
        Commands::Watch { collection, doc } => {
            commands::watch::run(&cli, collection, doc.as_deref())?
        }
        Commands::Version => {
            println!("KimDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("KimDB Client v{}", kimdb_client::VERSION);
        }
    }

    Ok(())
}

/// Builds the log filter: `RUST_LOG` when set and valid, else `debug` with
/// `--verbose` and `info` otherwise.
fn log_filter(verbose: bool, rust_log: Option<String>) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}
