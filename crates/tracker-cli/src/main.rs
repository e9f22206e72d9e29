//! tracker-history - record and query per-project conversation history.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracker_cli::{commands, config::Config, logging};
use tracker_core::{ConversationStore, QueryOptions};

use logging::{LogConfig, LogFormat};

/// Record and query per-project assistant conversation history.
#[derive(Parser, Debug)]
#[command(name = "tracker-history")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override the database path from config
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace logging (TRACE level for everything)
    #[arg(long, global = true)]
    trace: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "db=debug").
    /// Targets are prefixed with "tracker::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL", global = true)]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a new conversation and print its id
    Create {
        #[arg(short, long)]
        project: String,
        #[arg(short, long, default_value = "")]
        session_id: String,
        #[arg(long, default_value = "")]
        prompt: String,
    },
    /// Complete the most recent conversation for a project
    Update {
        #[arg(short, long)]
        project: String,
        #[arg(short, long, default_value = "")]
        reply: String,
        #[arg(short, long, default_value = "")]
        transcript: String,
    },
    /// List conversations for a project, most recent first
    Query {
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        limit: Option<i64>,
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
        #[arg(short, long)]
        search: Option<String>,
        /// Print records as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print the latest non-empty session id for a project
    LatestSession {
        #[arg(short, long)]
        project: String,
    },
    /// Print a single conversation as JSON
    Show { id: i64 },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = &cli.db {
        config.set_db_path(db);
    }
    tracing::debug!(target: "tracker::config", "Using database {}", config.db_path.display());

    let store = ConversationStore::open(&config.db_path)?;
    let mut out = std::io::stdout().lock();

    let status = match cli.command {
        Command::Create {
            project,
            session_id,
            prompt,
        } => {
            commands::create(&store, &project, &session_id, &prompt, &mut out)?;
            ExitCode::SUCCESS
        }
        Command::Update {
            project,
            reply,
            transcript,
        } => {
            commands::update(&store, &project, &reply, &transcript, &mut out)?;
            ExitCode::SUCCESS
        }
        Command::Query {
            project,
            limit,
            offset,
            search,
            json,
        } => {
            let opts = QueryOptions {
                project_path: project,
                limit: limit.unwrap_or(config.default_limit),
                offset,
                search,
            };
            commands::query(&store, &opts, json, &mut out)?;
            ExitCode::SUCCESS
        }
        Command::LatestSession { project } => {
            commands::latest_session(&store, &project, &mut out)?;
            ExitCode::SUCCESS
        }
        Command::Show { id } => {
            if commands::show(&store, id, &mut out)? {
                ExitCode::SUCCESS
            } else {
                tracing::warn!(target: "tracker::cli", "Conversation {} not found", id);
                ExitCode::FAILURE
            }
        }
    };

    store.close()?;
    Ok(status)
}
