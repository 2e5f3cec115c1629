//! Quill CLI: the main entry point.
//!
//! Commands:
//! - `classify` : Route a request to an intent, output type and tones
//! - `memory`   : Inspect and manage the session's context memory
//! - `config`   : Show or initialize configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quill",
    about = "Quill: intent routing and contextual memory for a writing assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a request
    Classify {
        /// The request text
        text: String,

        /// Text the request refers to (selected or attached by the user)
        #[arg(short, long)]
        reference: Option<String>,

        /// Ask for a one-sentence explanation of the classification
        #[arg(long)]
        plan: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage session context memory
    Memory {
        #[command(subcommand)]
        action: MemoryCommand,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum MemoryCommand {
    /// Record a completed exchange
    Add {
        query: String,
        response: String,

        /// Extra metadata entries as key=value
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },

    /// Show the most recent records
    Recent {
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },

    /// Rank records against a query
    Search {
        query: String,

        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
    },

    /// Render the prompt context block for a query
    Context {
        query: String,

        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
    },

    /// Show memory statistics
    Stats,

    /// Export all records as JSON
    Export { output: String },

    /// Replace all records with a JSON export
    Import { input: String },

    /// Delete one record by id
    Delete { id: String },

    /// Delete every record
    Clear {
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a default config file if none exists
    Init,

    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Classify {
            text,
            reference,
            plan,
            json,
        } => commands::classify::run(&text, reference, plan, json).await?,
        Commands::Memory { action } => match action {
            MemoryCommand::Add {
                query,
                response,
                meta,
            } => commands::memory::add(&query, &response, &meta).await?,
            MemoryCommand::Recent { count } => commands::memory::recent(count).await?,
            MemoryCommand::Search { query, top_k } => {
                commands::memory::search(&query, top_k).await?
            }
            MemoryCommand::Context { query, top_k } => {
                commands::memory::context(&query, top_k).await?
            }
            MemoryCommand::Stats => commands::memory::stats().await?,
            MemoryCommand::Export { output } => commands::memory::export(&output).await?,
            MemoryCommand::Import { input } => commands::memory::import(&input).await?,
            MemoryCommand::Delete { id } => commands::memory::delete(&id).await?,
            MemoryCommand::Clear { confirm } => commands::memory::clear(confirm).await?,
        },
        Commands::Config { action } => match action {
            ConfigCommand::Show => commands::config_cmd::show().await?,
            ConfigCommand::Init => commands::config_cmd::init().await?,
            ConfigCommand::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}
