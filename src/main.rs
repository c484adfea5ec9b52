use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use usage_etl::config::{parse_delimiter, parse_run_date, EtlConfig};
use usage_etl::logging;
use usage_etl::pipeline::storage::{MemoryStore, SqliteStore};
use usage_etl::pipeline::{create_schema, Pipeline, RunSummary};

#[derive(Parser)]
#[command(name = "usage_etl")]
#[command(about = "Load usage metrics from a delimited file into a relational store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, transform and load into the SQLite store
    Run(RunArgs),
    /// Extract and transform, then load into an in-memory store; nothing is persisted
    Check(RunArgs),
    /// Create the output tables in the SQLite store and exit
    Schema(RunArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// TOML config file (defaults to ./usage_etl.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Delimited input file
    #[arg(long)]
    input: Option<PathBuf>,
    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,
    /// Single-character field delimiter; "tab" for tab-separated input
    #[arg(long)]
    delimiter: Option<String>,
    /// Date given to records without a day, as YYYY-MM-DD
    #[arg(long)]
    run_date: Option<String>,
    /// Do not write invalid records to the fails table
    #[arg(long)]
    skip_fails: bool,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
    /// Write a Prometheus text snapshot of run metrics to this file
    #[arg(long)]
    metrics_out: Option<PathBuf>,
}

impl RunArgs {
    /// Layer CLI flags over file and environment configuration
    fn resolve_config(&self) -> Result<EtlConfig> {
        let mut config = EtlConfig::load(self.config.as_deref())?;
        if let Some(input) = &self.input {
            config.source.path = input.clone();
        }
        if let Some(database) = &self.database {
            config.store.path = database.clone();
        }
        if let Some(delimiter) = &self.delimiter {
            config.source.delimiter = parse_delimiter(delimiter)?;
        }
        if let Some(date) = &self.run_date {
            config.run.date = Some(parse_run_date(date)?);
        }
        if self.skip_fails {
            config.load.load_fails = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_summary(summary: &RunSummary, dry_run: bool, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let title = if dry_run { "Dry run results" } else { "Run results" };
    println!("\n📊 {} ({})", title, summary.run_id);
    println!("   Source: {}", summary.source_path.display());
    println!("   SHA-256: {}", summary.source_sha256);
    println!("   Run date: {}", summary.run_date);
    println!("   Rows extracted: {}", summary.rows_extracted);
    println!("   Valid: {}", summary.transform.valid_rows);
    println!("   Duplicates dropped: {}", summary.transform.duplicates_dropped);
    println!("   Invalid: {}", summary.transform.invalid_rows);
    println!("   Days defaulted: {}", summary.transform.days_defaulted);

    if !summary.transform.reject_reasons.is_empty() {
        println!("\n⚠️  Rejection reasons:");
        for (reason, count) in &summary.transform.reject_reasons {
            println!("   - {reason}: {count}");
        }
    }

    let verb = if dry_run { "Would write" } else { "Written" };
    println!("\n💾 {verb}:");
    println!("   users: {}", summary.loaded.users);
    println!("   projects: {}", summary.loaded.projects);
    println!("   metrics: {}", summary.loaded.metrics);
    if summary.fails_loaded {
        println!("   fails: {}", summary.loaded.fails);
    } else {
        println!("   fails: skipped");
    }
    println!("\n✅ Finished in {:.3}s", summary.elapsed_secs);
    Ok(())
}

fn execute(command: &Commands) -> Result<()> {
    match command {
        Commands::Run(args) => {
            let config = args.resolve_config()?;
            if !args.json {
                println!(
                    "🔄 Loading {} into {}...",
                    config.source.path.display(),
                    config.store.path.display()
                );
            }
            let mut store = SqliteStore::open(&config.store.path)
                .with_context(|| format!("opening store {}", config.store.path.display()))?;
            let summary = Pipeline::new(&config).run(&mut store)?;
            store.close()?;
            print_summary(&summary, false, args.json)
        }
        Commands::Check(args) => {
            let config = args.resolve_config()?;
            if !args.json {
                println!(
                    "🔍 Checking {} (nothing will be persisted)...",
                    config.source.path.display()
                );
            }
            let mut store = MemoryStore::new();
            let summary = Pipeline::new(&config).run(&mut store)?;
            print_summary(&summary, true, args.json)
        }
        Commands::Schema(args) => {
            let config = args.resolve_config()?;
            let mut store = SqliteStore::open(&config.store.path)
                .with_context(|| format!("opening store {}", config.store.path.display()))?;
            create_schema(&mut store)?;
            store.close()?;
            println!("✅ Tables ready in {}", config.store.path.display());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();
    let args = match &cli.command {
        Commands::Run(args) | Commands::Check(args) | Commands::Schema(args) => args,
    };

    let recorder = match &args.metrics_out {
        Some(_) => Some(usage_etl::metrics::install_recorder().map_err(anyhow::Error::msg)?),
        None => None,
    };

    let result = execute(&cli.command);
    if let Err(e) = &result {
        error!("usage_etl failed: {:#}", e);
    }

    if let (Some(path), Some(handle)) = (&args.metrics_out, recorder) {
        fs::write(path, handle.render())
            .with_context(|| format!("writing metrics snapshot to {}", path.display()))?;
        info!("Wrote metrics snapshot to {}", path.display());
    }

    result
}
