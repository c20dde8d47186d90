//! Point store maintenance CLI.
//!
//! # Responsibility
//! - Inspect and maintain a `venuemark` point store file outside AR sessions.
//! - Keep output deterministic (plain lines or JSON) for scripting.

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;
use venuemark_core::{
    core_version, default_log_level, init_logging, open_db, MarkerQuery, PointStore,
    SqlitePointStore,
};

/// Inspect and maintain venue marker stores.
#[derive(Parser)]
#[command(name = "venuemark")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Point store file (created and migrated when missing)
    #[arg(long, default_value = "venuemark.db", global = true)]
    db: PathBuf,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show marker and reference counts
    Stats,

    /// List distinct marker names under a reference code
    Names {
        /// Scanned reference code
        reference_code: String,
    },

    /// Print the markers of a reference code as JSON
    Export {
        /// Scanned reference code
        reference_code: String,

        /// Only markers with this exact name
        #[arg(short, long)]
        name: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Delete one marker by id
    Delete {
        /// Marker UUID
        id: Uuid,
    },

    /// Delete every marker of every reference code
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Print the engine version
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Commands::Version = cli.command {
        println!("venuemark_core version={}", core_version());
        return Ok(());
    }

    let conn = open_db(&cli.db)?;
    let store = SqlitePointStore::try_new(&conn)?;

    match cli.command {
        Commands::Stats => {
            let stats = store.stats()?;
            println!("markers={}", stats.total_markers);
            println!("references={}", stats.total_references);
        }
        Commands::Names { reference_code } => {
            for name in store.distinct_names(reference_code.trim())? {
                println!("{name}");
            }
        }
        Commands::Export {
            reference_code,
            name,
            pretty,
        } => {
            let mut query = MarkerQuery::for_reference(reference_code.trim());
            if let Some(name) = name {
                query = query.named(name);
            }
            let markers = store.query(&query)?;
            let json = if pretty {
                serde_json::to_string_pretty(&markers)?
            } else {
                serde_json::to_string(&markers)?
            };
            println!("{json}");
        }
        Commands::Delete { id } => {
            store.delete(id)?;
            info!("event=cli_delete module=cli status=ok marker_id={id}");
            println!("deleted {id}");
        }
        Commands::Clear { yes } => {
            if !yes {
                return Err("refusing to clear the store without --yes".into());
            }
            let removed = store.clear_all()?;
            info!("event=cli_clear module=cli status=ok removed={removed}");
            println!("removed={removed}");
        }
        // printed before the store is opened
        Commands::Version => {}
    }
    Ok(())
}
