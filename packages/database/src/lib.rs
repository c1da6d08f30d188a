#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Storage for the parking directory.
//!
//! [`ParkingStore`] is the seam the import driver and moderation commands
//! write through. [`postgres::PostgresStore`] backs it with `switchy_database`
//! raw SQL against the `parking_locations` and `submissions` tables;
//! [`memory::MemoryStore`] keeps everything in process for tests and dry
//! runs. Schema changes ship as embedded `switchy_schema` migrations.

pub mod db;
pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;

use async_trait::async_trait;
use cph_parking_models::{
    InvalidTransitionError, ModerationDecision, NewParkingLocation, ParkingData, ParkingLocation,
    Submission, SubmissionStatus,
};
use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// The database could not be reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// Stored submission payload is not valid JSON.
    #[error("Invalid submission payload: {0}")]
    Json(#[from] serde_json::Error),

    /// No submission with this id exists.
    #[error("Submission {id} not found")]
    NotFound {
        /// The requested id.
        id: i64,
    },

    /// The submission has already been moderated.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransitionError),
}

/// Persistence for parking locations and user submissions.
#[async_trait]
pub trait ParkingStore: Send + Sync {
    /// Inserts or updates locations keyed on `osm_id` and returns the number
    /// of rows written. Existing rows keep their `id` and `created_at`.
    /// When a batch repeats an `osm_id`, the last occurrence wins. An empty
    /// batch writes nothing and returns 0.
    async fn upsert_locations(&self, locations: &[NewParkingLocation]) -> Result<u64, DbError>;

    /// Returns every stored location ordered by id.
    async fn list_locations(&self) -> Result<Vec<ParkingLocation>, DbError>;

    /// Stores a new pending submission.
    async fn insert_submission(
        &self,
        user_id: &str,
        data: &ParkingData,
    ) -> Result<Submission, DbError>;

    /// Looks up a submission by id.
    async fn get_submission(&self, id: i64) -> Result<Option<Submission>, DbError>;

    /// Lists submissions newest first, optionally filtered by status.
    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, DbError>;

    /// Applies a moderation decision to a pending submission.
    ///
    /// Approving also adds the submitted location to the directory as a
    /// verified entry without an `osm_id`.
    ///
    /// # Errors
    ///
    /// * [`DbError::NotFound`] if the id is unknown
    /// * [`DbError::InvalidTransition`] if the submission is not pending
    async fn moderate_submission(
        &self,
        id: i64,
        decision: ModerationDecision,
        notes: Option<&str>,
    ) -> Result<Submission, DbError>;
}

/// Collapses repeated `osm_id`s so the last occurrence wins, keeping the
/// order in which each surviving record was last seen.
#[must_use]
pub fn dedupe_by_osm_id(locations: &[NewParkingLocation]) -> Vec<&NewParkingLocation> {
    let mut last_seen: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, location) in locations.iter().enumerate() {
        last_seen.insert(location.osm_id.as_str(), i);
    }

    locations
        .iter()
        .enumerate()
        .filter(|(i, location)| last_seen.get(location.osm_id.as_str()) == Some(i))
        .map(|(_, location)| location)
        .collect()
}

/// Builds the error for a submission that is no longer pending.
const fn transition_error(current: SubmissionStatus, decision: ModerationDecision) -> DbError {
    DbError::InvalidTransition(InvalidTransitionError {
        from: current,
        to: decision.target_status(),
    })
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}
