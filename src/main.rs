use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use checkpeek::cli::inspect::{inspect_thread, InspectOptions};
use checkpeek::cli::{history, report, schema, threads};
use checkpeek::config::Config;

#[derive(Parser)]
#[command(name = "checkpeek")]
#[command(version, about = "Inspect agent checkpoint databases")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, global = true, default_value = "checkpeek.yaml")]
    config: String,

    /// Checkpoint database (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List threads and inspect the preferred one into the report file (default)
    Report {
        /// Report file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dump tables, columns and sample rows
    Schema,

    /// List threads with their checkpoint counts
    Threads,

    /// Show the message history of a thread
    Inspect {
        /// Thread ID
        thread_id: String,

        /// Inspect this checkpoint instead of the latest
        #[arg(long)]
        checkpoint: Option<String>,

        /// Checkpoint namespace
        #[arg(long)]
        ns: Option<String>,
    },

    /// List a thread's checkpoints, newest first
    History {
        /// Thread ID
        thread_id: String,

        /// Maximum number of checkpoints
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config
    let mut config = Config::load(&cli.config)?;
    if let Some(db) = &cli.db {
        config.database.path = db.to_string_lossy().to_string();
    }
    let db_path = config.database_path();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command.unwrap_or(Commands::Report { output: None }) {
        Commands::Report { output } => {
            let output = output.unwrap_or_else(|| config.output_path());
            report::run(&config, &output)?;
        }
        Commands::Schema => {
            schema::run(&db_path, config.display.sample_rows, &mut out)?;
        }
        Commands::Threads => {
            threads::list_threads(&db_path, &mut out)?;
        }
        Commands::Inspect {
            thread_id,
            checkpoint,
            ns,
        } => {
            let mut options = InspectOptions::from_config(&config);
            options.checkpoint_id = checkpoint;
            if let Some(ns) = ns {
                options.namespace = ns;
            }
            inspect_thread(&db_path, &thread_id, &options, &mut out)?;
        }
        Commands::History { thread_id, limit } => {
            history::run(&db_path, &config.database.namespace, &thread_id, limit, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
