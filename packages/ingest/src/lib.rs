#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for importing Copenhagen parking facilities from OpenStreetMap
//! into the parking directory.
//!
//! One run fetches every matching element, normalizes it, and upserts the
//! accepted records in a single batch keyed on the OSM id, so re-running
//! converges on the same rows.

pub mod config;

use std::time::Instant;

use cph_parking_database::{DbError, ParkingStore};
use cph_parking_ingest_models::ImportSummary;
use cph_parking_models::NewParkingLocation;
use cph_parking_source::normalize::normalize_elements;
use cph_parking_source::{ElementSource, SourceError};

use crate::config::ConfigError;

/// Errors that abort an import or CLI command.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Fetching from the query service failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Reading or writing the store failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Required configuration is missing.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fetches, normalizes, and upserts all parking facilities from `source`.
///
/// When nothing normalizes, the store is never called and a zero-work
/// summary is returned.
///
/// # Errors
///
/// Returns [`IngestError::Source`] if the fetch fails or
/// [`IngestError::Database`] if the upsert fails. Nothing is retried.
pub async fn run_import(
    source: &dyn ElementSource,
    store: &dyn ParkingStore,
) -> Result<ImportSummary, IngestError> {
    let start = Instant::now();
    log::info!("Fetching parking data from {}...", source.name());

    let elements = source.fetch_elements().await?;
    let locations = normalize_elements(&elements);

    let fetched = elements.len() as u64;
    let accepted = locations.len() as u64;
    let skipped = fetched - accepted;
    if skipped > 0 {
        log::info!("Skipped {skipped} element(s) without coordinates");
    }

    let mut summary = summarize(source.name(), fetched, &locations);

    if locations.is_empty() {
        log::warn!("No parking locations found, nothing to store");
        summary.duration = start.elapsed();
        return Ok(summary);
    }

    log::info!("Upserting {accepted} parking locations...");
    summary.upserted = store.upsert_locations(&locations).await?;
    summary.duration = start.elapsed();

    log::info!(
        "Imported {} locations from {} in {:.1}s",
        summary.upserted,
        source.id(),
        summary.duration.as_secs_f64()
    );

    Ok(summary)
}

/// Builds the counting part of a summary for the accepted locations.
fn summarize(source_name: &str, fetched: u64, locations: &[NewParkingLocation]) -> ImportSummary {
    let count = |pred: fn(&NewParkingLocation) -> bool| {
        locations.iter().filter(|l| pred(l)).count() as u64
    };

    ImportSummary {
        source_name: source_name.to_string(),
        fetched,
        accepted: locations.len() as u64,
        skipped: fetched - locations.len() as u64,
        upserted: 0,
        with_operator: count(|l| l.operator.is_some()),
        with_capacity: count(|l| l.capacity.is_some()),
        with_opening_hours: count(|l| l.opening_hours.is_some()),
        duration: std::time::Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use cph_parking_database::memory::MemoryStore;
    use cph_parking_models::{
        ModerationDecision, ParkingData, ParkingLocation, Submission, SubmissionStatus,
    };
    use cph_parking_source_models::{Coordinates, ElementKind, RawMapElement};

    use super::*;

    #[test]
    fn missing_config_reads_as_plain_message() {
        let err = IngestError::from(ConfigError::Missing("DATABASE_URL"));
        assert!(matches!(err, IngestError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Missing required environment variable DATABASE_URL"
        );
    }

    struct FixtureSource {
        elements: Vec<RawMapElement>,
    }

    #[async_trait]
    impl ElementSource for FixtureSource {
        fn id(&self) -> &str {
            "fixture"
        }

        fn name(&self) -> &str {
            "Fixture"
        }

        async fn fetch_elements(&self) -> Result<Vec<RawMapElement>, SourceError> {
            Ok(self.elements.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ElementSource for FailingSource {
        fn id(&self) -> &str {
            "failing"
        }

        fn name(&self) -> &str {
            "Failing"
        }

        async fn fetch_elements(&self) -> Result<Vec<RawMapElement>, SourceError> {
            Err(SourceError::Status {
                status: 504,
                body: "Gateway Timeout".to_string(),
            })
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ParkingStore for BrokenStore {
        async fn upsert_locations(&self, _: &[NewParkingLocation]) -> Result<u64, DbError> {
            Err(DbError::Connection {
                message: "connection reset".to_string(),
            })
        }

        async fn list_locations(&self) -> Result<Vec<ParkingLocation>, DbError> {
            Ok(vec![])
        }

        async fn insert_submission(
            &self,
            _: &str,
            _: &ParkingData,
        ) -> Result<Submission, DbError> {
            unimplemented!()
        }

        async fn get_submission(&self, _: i64) -> Result<Option<Submission>, DbError> {
            Ok(None)
        }

        async fn list_submissions(
            &self,
            _: Option<SubmissionStatus>,
        ) -> Result<Vec<Submission>, DbError> {
            Ok(vec![])
        }

        async fn moderate_submission(
            &self,
            id: i64,
            _: ModerationDecision,
            _: Option<&str>,
        ) -> Result<Submission, DbError> {
            Err(DbError::NotFound { id })
        }
    }

    fn node(id: i64, tags: &[(&str, &str)]) -> RawMapElement {
        RawMapElement {
            kind: ElementKind::Node,
            id,
            lat: Some(55.676),
            lon: Some(12.568),
            center: None,
            tags: tags.iter().copied().collect(),
        }
    }

    fn way_without_center(id: i64) -> RawMapElement {
        RawMapElement {
            kind: ElementKind::Way,
            id,
            lat: None,
            lon: None,
            center: None,
            tags: [("building", "parking")].into_iter().collect(),
        }
    }

    fn fixture() -> FixtureSource {
        FixtureSource {
            elements: vec![
                node(1, &[("name", "Test P-hus"), ("capacity", "75")]),
                node(2, &[("operator", "Q-Park"), ("opening_hours", "24/7")]),
                way_without_center(3),
                RawMapElement {
                    kind: ElementKind::Way,
                    id: 4,
                    lat: None,
                    lon: None,
                    center: Some(Coordinates {
                        lat: 55.68,
                        lon: 12.58,
                    }),
                    tags: [("capacity", "many")].into_iter().collect(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn imports_and_summarizes() {
        let store = MemoryStore::new();
        let summary = run_import(&fixture(), &store).await.unwrap();

        assert_eq!(summary.source_name, "Fixture");
        assert_eq!(summary.fetched, 4);
        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.upserted, 3);
        assert_eq!(summary.with_operator, 1);
        assert_eq!(summary.with_capacity, 1);
        assert_eq!(summary.with_opening_hours, 1);
        assert_eq!(store.upsert_calls(), 1);

        let mut osm_ids: Vec<String> = store
            .list_locations()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|l| l.osm_id)
            .collect();
        osm_ids.sort();
        assert_eq!(osm_ids, vec!["node/1", "node/2", "way/4"]);
    }

    #[tokio::test]
    async fn rerun_converges() {
        let store = MemoryStore::new();
        run_import(&fixture(), &store).await.unwrap();
        let first = store.list_locations().await.unwrap();
        run_import(&fixture(), &store).await.unwrap();
        let second = store.list_locations().await.unwrap();

        assert_eq!(first.len(), second.len());
        assert_eq!(
            first.iter().map(|l| l.id).collect::<Vec<_>>(),
            second.iter().map(|l| l.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn empty_fetch_never_writes() {
        let store = MemoryStore::new();
        let source = FixtureSource { elements: vec![] };
        let summary = run_import(&source, &store).await.unwrap();

        assert!(summary.is_empty());
        assert_eq!(summary.fetched, 0);
        assert_eq!(summary.upserted, 0);
        assert_eq!(store.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn all_skipped_never_writes() {
        let source = FixtureSource {
            elements: vec![way_without_center(1), way_without_center(2)],
        };
        // A broken store proves the writer is not called.
        let summary = run_import(&source, &BrokenStore).await.unwrap();
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.upserted, 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_fatal() {
        let store = MemoryStore::new();
        let err = run_import(&FailingSource, &store).await.unwrap_err();
        assert!(matches!(err, IngestError::Source(SourceError::Status { status: 504, .. })));
        assert_eq!(store.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn store_failure_is_fatal() {
        let err = run_import(&fixture(), &BrokenStore).await.unwrap_err();
        assert!(matches!(err, IngestError::Database(DbError::Connection { .. })));
    }
}
