#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the parking directory tool.

use clap::{Parser, Subcommand};
use cph_parking_database::memory::MemoryStore;
use cph_parking_database::postgres::PostgresStore;
use cph_parking_database::{ParkingStore, run_migrations};
use cph_parking_ingest::config::IngestConfig;
use cph_parking_ingest::{IngestError, run_import};
use cph_parking_models::{ModerationDecision, SubmissionStatus};
use cph_parking_source::overpass::OverpassClient;
use cph_parking_source::query::build_query;
use cph_parking_source::registry::{DEFAULT_QUERY_ID, find_query};

#[derive(Parser)]
#[command(name = "cph_parking_ingest", about = "Copenhagen parking directory tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch parking facilities from OpenStreetMap and upsert them
    /// (the default when no command is given)
    Import {
        /// Query definition to run
        #[arg(long, default_value = DEFAULT_QUERY_ID)]
        query: String,
        /// Fetch and normalize without touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Run database migrations
    Migrate,
    /// Print the rendered Overpass query
    Query {
        /// Query definition to render
        #[arg(long, default_value = DEFAULT_QUERY_ID)]
        query: String,
    },
    /// List user submissions, newest first
    Submissions {
        /// Only show submissions with this status (pending, approved, rejected)
        #[arg(long)]
        status: Option<SubmissionStatus>,
    },
    /// Approve a pending submission and add it to the directory
    Approve {
        /// Submission id
        id: i64,
        /// Note stored with the decision
        #[arg(long)]
        notes: Option<String>,
    },
    /// Reject a pending submission
    Reject {
        /// Submission id
        id: i64,
        /// Note stored with the decision
        #[arg(long)]
        notes: Option<String>,
    },
}

async fn connect_store() -> Result<PostgresStore, IngestError> {
    let config = IngestConfig::from_env()?;
    let store = PostgresStore::connect(&config.database_url).await?;
    run_migrations(store.database()).await?;
    Ok(store)
}

async fn import(query: &str, dry_run: bool) -> Result<(), IngestError> {
    let definition = find_query(query)?;
    let source = OverpassClient::new(definition)?;

    let summary = if dry_run {
        log::info!("Dry run, results are kept in memory");
        run_import(&source, &MemoryStore::new()).await?
    } else {
        let store = connect_store().await?;
        run_import(&source, &store).await?
    };

    println!("{summary}");
    Ok(())
}

async fn moderate(
    id: i64,
    decision: ModerationDecision,
    notes: Option<String>,
) -> Result<(), IngestError> {
    let store = connect_store().await?;
    let submission = store
        .moderate_submission(id, decision, notes.as_deref())
        .await?;
    println!(
        "Submission {} ({}) is now {}",
        submission.id, submission.parking_data.name, submission.status
    );
    Ok(())
}

async fn run(command: Commands) -> Result<(), IngestError> {
    match command {
        Commands::Import { query, dry_run } => {
            import(&query, dry_run).await?;
        }
        Commands::Migrate => {
            log::info!("Running database migrations...");
            connect_store().await?;
            log::info!("Migrations complete.");
        }
        Commands::Query { query } => {
            print!("{}", build_query(&find_query(&query)?));
        }
        Commands::Submissions { status } => {
            let store = connect_store().await?;
            let submissions = store.list_submissions(status).await?;
            println!("{:<8} {:<10} {:<20} NAME", "ID", "STATUS", "SUBMITTED");
            println!("{}", "-".repeat(70));
            for submission in &submissions {
                println!(
                    "{:<8} {:<10} {:<20} {}",
                    submission.id,
                    submission.status,
                    submission.created_at.format("%Y-%m-%d %H:%M:%S"),
                    submission.parking_data.name
                );
            }
            println!("{} submission(s)", submissions.len());
        }
        Commands::Approve { id, notes } => {
            moderate(id, ModerationDecision::Approve, notes).await?;
        }
        Commands::Reject { id, notes } => {
            moderate(id, ModerationDecision::Reject, notes).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Import {
        query: DEFAULT_QUERY_ID.to_string(),
        dry_run: false,
    });

    if let Err(e) = run(command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
