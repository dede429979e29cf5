//! Cello Migrate
//!
//! Two-stage migration of Cello projects and tokens from PostgreSQL to
//! DynamoDB, plus the timestamp repair and table dump tools.

use anyhow::{Context, Result};
use cello_migrate::{
    config::{PostgresConfig, Settings},
    db::{DynamoDbStore, ItemStore, PostgresSource, StoreError},
    logging::{init_tracing, run_span, LogOptions},
    schemas::{read_table_dump_path, RawSnapshot},
    services::{
        dump_source_to_file, dump_table, LoadOptions, LoadSummary, Loader, RepairSummary,
        TimestampRepair,
    },
};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

/// Cello Migrate
///
/// Migrates Cello projects and tokens from PostgreSQL to DynamoDB.
#[derive(Parser, Debug)]
#[command(name = "cello-migrate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit console logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Also append JSON logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// AWS region (overrides AWS_REGION env var)
    #[arg(long, global = true)]
    region: Option<String>,

    /// DynamoDB table (overrides DYNAMODB_TABLE env var)
    #[arg(long, global = true)]
    table: Option<String>,

    /// DynamoDB endpoint URL, e.g. for DynamoDB Local (overrides DYNAMODB_ENDPOINT_URL)
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump projects and tokens from PostgreSQL into a migration snapshot
    ///
    /// The password is read from PGPASSWORD.
    DumpPostgres {
        /// PostgreSQL server host, optionally with :port
        db_host: String,
        /// PostgreSQL username
        db_user: String,
        /// PostgreSQL database name
        db_name: String,
        /// Path of the snapshot file to write
        output_file: PathBuf,
    },

    /// Load a migration snapshot into DynamoDB
    Load {
        /// Snapshot file written by dump-postgres
        data_file: PathBuf,
        /// Check which items exist instead of writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Convert legacy token timestamps in a table dump to RFC 3339
    RepairTimestamps {
        /// Table dump written by dump-table
        #[arg(long)]
        file: PathBuf,
        /// Show what would be updated without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Dump every item of the DynamoDB table into a JSON file
    DumpTable {
        /// Output JSON file path
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level).
    // Validation waits until the CLI overrides are applied.
    let mut settings = Settings::load()?;

    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(region) = args.region {
        settings.aws_region = region;
    }
    if let Some(table) = args.table {
        settings.dynamodb_table = table;
    }
    if let Some(endpoint_url) = args.endpoint_url {
        settings.dynamodb_endpoint_url = Some(endpoint_url);
    }
    settings.validate()?;

    init_tracing(&LogOptions {
        level: settings.log_level.clone(),
        json: args.log_json,
        file: args.log_file,
    })?;

    tracing::debug!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        region = %settings.aws_region,
        table = %settings.dynamodb_table,
        "Starting"
    );

    match args.command {
        Command::DumpPostgres {
            db_host,
            db_user,
            db_name,
            output_file,
        } => {
            settings.postgres = PostgresConfig::from_env()?;
            settings.postgres.set_host_port(&db_host)?;
            settings.postgres.user = db_user;
            settings.postgres.database = db_name;
            settings.postgres.validate()?;
            dump_postgres(&settings, output_file)
                .instrument(run_span("dump-postgres"))
                .await
        }
        Command::Load { data_file, dry_run } => {
            load(&settings, data_file, dry_run)
                .instrument(run_span("load"))
                .await
        }
        Command::RepairTimestamps { file, dry_run } => {
            repair_timestamps(&settings, file, dry_run)
                .instrument(run_span("repair-timestamps"))
                .await
        }
        Command::DumpTable { output } => {
            dump_dynamodb_table(&settings, output)
                .instrument(run_span("dump-table"))
                .await
        }
    }
}

async fn dump_postgres(settings: &Settings, output_file: PathBuf) -> Result<ExitCode> {
    let source = PostgresSource::connect(&settings.postgres).await?;
    let snapshot = dump_source_to_file(&source, &output_file).await?;

    println!("\n✓ Data dump completed successfully!");
    println!("File created: {}", output_file.display());
    println!("Projects processed: {}", snapshot.project_count());
    println!("Cello tokens processed: {}", snapshot.token_count());

    Ok(ExitCode::SUCCESS)
}

async fn load(settings: &Settings, data_file: PathBuf, dry_run: bool) -> Result<ExitCode> {
    let snapshot = RawSnapshot::from_path(&data_file)
        .with_context(|| format!("Error loading migration data from {}", data_file.display()))?;
    tracing::info!(projects = snapshot.projects.len(), "✓ Loaded migration data");

    let store = connect(settings).await?;

    tracing::info!(dry_run, "Starting data migration");
    let summary = Loader::new(&store, LoadOptions { dry_run })
        .load(&snapshot)
        .await?;

    print_load_summary(&summary, dry_run);

    Ok(if summary.failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn repair_timestamps(settings: &Settings, file: PathBuf, dry_run: bool) -> Result<ExitCode> {
    println!("Configuration:");
    println!("  Input file: {}", file.display());
    println!("  DynamoDB table: {}", settings.dynamodb_table);
    println!("  Region: {}", settings.aws_region);
    println!("  Dry run: {}", dry_run);
    println!();

    let records = read_table_dump_path(&file)
        .with_context(|| format!("Error loading records from {}", file.display()))?;
    println!("Loaded {} total records", records.len());
    println!();

    let store = if dry_run {
        DynamoDbStore::from_settings(settings).await
    } else {
        connect(settings).await?
    };

    let report = TimestampRepair::new(&store, dry_run).run(&records).await?;
    print_repair_summary(&report.summary, dry_run);

    Ok(if report.summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn dump_dynamodb_table(settings: &Settings, output: PathBuf) -> Result<ExitCode> {
    let store = connect(settings).await?;

    let file = File::create(&output)
        .with_context(|| format!("Cannot create output file {}", output.display()))?;
    let count = dump_table(&store, BufWriter::new(file)).await?;

    println!(
        "Dumped {} items from table '{}' in region '{}' to {}",
        count,
        settings.dynamodb_table,
        settings.aws_region,
        output.display()
    );

    Ok(ExitCode::SUCCESS)
}

/// Build the store and verify the table is reachable
async fn connect(settings: &Settings) -> Result<DynamoDbStore> {
    let store = DynamoDbStore::from_settings(settings).await;

    match store.check_connection().await {
        Ok(()) => {
            tracing::info!(table = %store.table(), "✓ Connected to DynamoDB table");
            Ok(store)
        }
        Err(StoreError::TableNotFound(_)) => anyhow::bail!(
            "DynamoDB table '{}' not found in region '{}'",
            settings.dynamodb_table,
            settings.aws_region
        ),
        Err(StoreError::Auth(msg)) => anyhow::bail!(
            "AWS credentials were rejected ({msg}). Please configure your AWS credentials."
        ),
        Err(e) => Err(e).context("Error connecting to DynamoDB"),
    }
}

fn print_load_summary(summary: &LoadSummary, dry_run: bool) {
    println!();
    if summary.failed() {
        println!("✗ Migration finished with failures");
    } else {
        println!("✓ Migration completed successfully!");
    }
    println!("Summary:");
    println!("  - Total projects in data: {}", summary.total_projects);
    println!("  - Projects processed successfully: {}", summary.projects_processed);
    println!("  - Projects failed: {}", summary.projects_failed);
    println!("  - Total items loaded: {}", summary.items_processed);
    println!("  - Total items skipped: {}", summary.items_skipped);
    println!("  - Total items processed: {}", summary.items_handled());
    if dry_run {
        println!();
        println!("DRY RUN MODE - No items were written to DynamoDB");
    }
}

fn print_repair_summary(summary: &RepairSummary, dry_run: bool) {
    println!("{}", "-".repeat(80));
    println!("Summary:");
    println!("  Total records: {}", summary.total);
    println!("  Skipped: {}", summary.skipped);
    for (reason, count) in &summary.skipped_by_reason {
        println!("    {}: {}", reason, count);
    }
    println!("  Processed: {}", summary.processed);
    println!("  Successful: {}", summary.succeeded);
    println!("  Failed: {}", summary.failed);

    if dry_run {
        println!();
        println!("DRY RUN MODE - No actual updates were made to DynamoDB");
    }
}
