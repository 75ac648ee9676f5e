//! Kuckmal Ingest - Filmliste import tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kuckmal_common::logging::{init_logging, LogConfig, LogLevel};
use kuckmal_common::url::reconstruct_url;
use kuckmal_common::ImportMode;
use kuckmal_ingest::progress::{create_spinner, describe_status};
use kuckmal_ingest::{ImportOrchestrator, ImportReport, IngestConfig, MediaStore, SqliteMediaStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "kuckmal-ingest")]
#[command(author, version, about = "Kuckmal Filmliste ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database file (overrides KUCKMAL_DATABASE_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Records per transaction (overrides KUCKMAL_BATCH_SIZE)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a compressed Filmliste file
    Import {
        /// Filmliste-akt.xz or Filmliste-diff.xz
        file: PathBuf,

        /// full: clear and reload, diff: update existing entries
        #[arg(short, long, default_value = "full")]
        mode: ImportMode,

        /// Keep the decompressed intermediate file
        #[arg(long)]
        keep_intermediate: bool,
    },

    /// Print the number of stored entries
    Count,

    /// Remove every stored entry
    Clear,

    /// Reconstruct a pipe-encoded URL
    ResolveUrl {
        /// Absolute URL of the record
        #[arg(long)]
        base: String,

        /// Relative reference, e.g. 26|hd.mp4
        relative: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("kuckmal-ingest")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    let mut config = IngestConfig::from_env().context("Failed to load ingest configuration")?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;

    match cli.command {
        Command::Import {
            file,
            mode,
            keep_intermediate,
        } => {
            if keep_intermediate {
                config.keep_intermediate = true;
            }
            let report = import(config, file, mode, cli.json).await?;
            print_report(&report, cli.json)?;
        },
        Command::Count => {
            let store = open_store(&config)?;
            let count = store.count()?;
            if cli.json {
                println!("{}", serde_json::json!({ "count": count }));
            } else {
                println!("{} entries", count);
            }
        },
        Command::Clear => {
            let mut store = open_store(&config)?;
            let removed = store.clear()?;
            if cli.json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else {
                println!("Removed {} entries", removed);
            }
        },
        Command::ResolveUrl { base, relative } => {
            let url = reconstruct_url(&base, &relative);
            if cli.json {
                println!("{}", serde_json::json!({ "url": url }));
            } else {
                println!("{}", url);
            }
        },
    }

    Ok(())
}

fn open_store(config: &IngestConfig) -> Result<SqliteMediaStore> {
    SqliteMediaStore::open(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })
}

async fn import(
    config: IngestConfig,
    file: PathBuf,
    mode: ImportMode,
    quiet: bool,
) -> Result<ImportReport> {
    let store = open_store(&config)?;
    let orchestrator = Arc::new(ImportOrchestrator::new(config, store));
    info!(file = %file.display(), mode = %mode, "Importing Filmliste");

    let controller = Arc::clone(orchestrator.controller());
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling import");
            controller.cancel();
        }
    });

    let spinner = (!quiet).then(|| create_spinner("Starting import"));
    let poller = spinner.clone().map(|pb| {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(250));
            loop {
                interval.tick().await;
                pb.set_message(describe_status(&orchestrator.status()));
            }
        })
    });

    let committed = spinner.clone();
    let result = orchestrator
        .import_with_progress(file, mode, move |n| {
            if let Some(pb) = &committed {
                pb.set_position(n);
            }
        })
        .await;

    ctrl_c.abort();
    if let Some(poller) = poller {
        poller.abort();
    }
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    result.with_context(|| format!("{} import failed", mode))
}

fn print_report(report: &ImportReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Import {} ({}) complete", report.run_id, report.mode);
    println!("  entries imported: {}", report.records_imported);
    println!("  rows changed:     {}", report.rows_affected);
    println!("  records scanned:  {}", report.records_scanned);
    println!("  dropped (noise):  {}", report.records_dropped);
    println!("  short records:    {}", report.short_records);
    println!("  batches:          {}", report.batches);
    println!("  decompressed:     {} bytes", report.bytes_decompressed);
    println!("  duration:         {:.2}s", report.duration_secs);
    if let Some(path) = &report.intermediate {
        println!("  intermediate:     {}", path.display());
    }
    Ok(())
}
