//! voidarc Command-Line Client
//!
//! Inspects voidable tables and drives archival, restore, and shadow-table
//! maintenance against a database file.

mod formatter;

use clap::{Parser, Subcommand};
use formatter::OutputFormat;
use std::path::PathBuf;
use voidarc_core::{ArchiveEngine, DEFAULT_BATCH_SIZE};

/// voidarc Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "voidarc")]
#[command(version, about = "Archive soft-deleted rows into shadow tables")]
pub struct Args {
    /// Database file to operate on
    #[arg(short, long)]
    pub db: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Rows moved per transaction
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tables with voided-data counts
    Tables,
    /// List non-empty archive tables
    Archives,
    /// Show the foreign-key dependency graph
    Graph,
    /// Archive voided rows (for one table and its dependents, or everything)
    Archive {
        /// Table to archive; omit to archive all voidable tables
        table: Option<String>,
    },
    /// Merge an archive table back into its source and drop it
    Restore {
        /// Source table name (e.g. "visit", not "archive_visit")
        table: String,
    },
    /// Drop an archive table without restoring it
    Drop {
        /// Archive table name (must carry the "archive_" prefix)
        table: String,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("voidarc=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ArchiveEngine::open(&args.db)?.with_batch_size(args.batch_size);

    match &args.command {
        Command::Tables => {
            let tables = engine.list_tables()?;
            println!("{}", formatter::format_descriptors(&tables, args.format));
        }
        Command::Archives => {
            let shadows = engine.list_shadow_tables()?;
            println!("{}", formatter::format_descriptors(&shadows, args.format));
        }
        Command::Graph => {
            let graph = engine.dependency_graph()?;
            println!("{}", formatter::format_graph(&graph, args.format));
        }
        Command::Archive { table } => {
            let report = engine.run_archival(table.as_deref())?;
            println!("{}", formatter::format_report(&report, args.format));
            if !report.failures().is_empty() {
                std::process::exit(2);
            }
        }
        Command::Restore { table } => {
            engine.restore(table)?;
            println!("Restored {} and dropped its archive table", table);
        }
        Command::Drop { table } => {
            engine.drop_shadow(table)?;
            println!("Dropped {}", table);
        }
    }

    Ok(())
}
