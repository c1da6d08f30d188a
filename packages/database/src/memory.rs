//! In-process [`ParkingStore`] for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use cph_parking_models::{
    ModerationDecision, NewParkingLocation, ParkingData, ParkingLocation, Submission,
    SubmissionStatus,
};

use crate::{DbError, ParkingStore, dedupe_by_osm_id, transition_error};

#[derive(Debug, Default)]
struct State {
    next_location_id: i64,
    next_submission_id: i64,
    locations: BTreeMap<i64, ParkingLocation>,
    by_osm_id: BTreeMap<String, i64>,
    submissions: BTreeMap<i64, Submission>,
    upsert_calls: usize,
}

/// A [`ParkingStore`] that keeps all rows in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times [`ParkingStore::upsert_locations`] has been called
    /// with a non-empty batch.
    #[must_use]
    pub fn upsert_calls(&self) -> usize {
        self.lock().upsert_calls
    }

    /// Number of stored locations.
    #[must_use]
    pub fn location_count(&self) -> usize {
        self.lock().locations.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn upsert(&mut self, location: &NewParkingLocation) {
        let now = Utc::now();

        if let Some(existing) = self
            .by_osm_id
            .get(&location.osm_id)
            .and_then(|id| self.locations.get_mut(id))
        {
            existing.name.clone_from(&location.name);
            existing.address.clone_from(&location.address);
            existing.latitude = location.latitude;
            existing.longitude = location.longitude;
            existing.operator.clone_from(&location.operator);
            existing.fee_info = Some(location.fee_info.clone());
            existing.opening_hours.clone_from(&location.opening_hours);
            existing.capacity = location.capacity;
            existing.verified = location.verified;
            existing.updated_at = now;
            return;
        }

        self.next_location_id += 1;
        let id = self.next_location_id;
        self.by_osm_id.insert(location.osm_id.clone(), id);
        self.locations.insert(
            id,
            ParkingLocation {
                id,
                osm_id: Some(location.osm_id.clone()),
                name: location.name.clone(),
                address: location.address.clone(),
                latitude: location.latitude,
                longitude: location.longitude,
                parking_type: cph_parking_models::ParkingType::default(),
                operator: location.operator.clone(),
                fee_info: Some(location.fee_info.clone()),
                opening_hours: location.opening_hours.clone(),
                capacity: location.capacity,
                verified: location.verified,
                created_at: now,
                updated_at: now,
            },
        );
    }

    fn insert_verified(&mut self, data: &ParkingData) {
        let now = Utc::now();
        self.next_location_id += 1;
        let id = self.next_location_id;
        self.locations.insert(
            id,
            ParkingLocation {
                id,
                osm_id: None,
                name: data.name.clone(),
                address: data.address.clone(),
                latitude: data.latitude,
                longitude: data.longitude,
                parking_type: data.parking_type,
                operator: data.operator.clone(),
                fee_info: data.fee_info.clone(),
                opening_hours: None,
                capacity: None,
                verified: true,
                created_at: now,
                updated_at: now,
            },
        );
    }
}

#[async_trait]
impl ParkingStore for MemoryStore {
    async fn upsert_locations(&self, locations: &[NewParkingLocation]) -> Result<u64, DbError> {
        if locations.is_empty() {
            return Ok(0);
        }

        let mut state = self.lock();
        state.upsert_calls += 1;

        let deduped = dedupe_by_osm_id(locations);
        for location in &deduped {
            state.upsert(location);
        }

        Ok(deduped.len() as u64)
    }

    async fn list_locations(&self) -> Result<Vec<ParkingLocation>, DbError> {
        Ok(self.lock().locations.values().cloned().collect())
    }

    async fn insert_submission(
        &self,
        user_id: &str,
        data: &ParkingData,
    ) -> Result<Submission, DbError> {
        let mut state = self.lock();
        state.next_submission_id += 1;
        let now = Utc::now();

        let submission = Submission {
            id: state.next_submission_id,
            user_id: user_id.to_string(),
            parking_data: data.clone(),
            status: SubmissionStatus::Pending,
            moderator_notes: None,
            created_at: now,
            updated_at: now,
        };
        state.submissions.insert(submission.id, submission.clone());

        Ok(submission)
    }

    async fn get_submission(&self, id: i64) -> Result<Option<Submission>, DbError> {
        Ok(self.lock().submissions.get(&id).cloned())
    }

    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, DbError> {
        let state = self.lock();
        let mut submissions: Vec<Submission> = state
            .submissions
            .values()
            .filter(|s| status.is_none_or(|wanted| s.status == wanted))
            .cloned()
            .collect();
        submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(submissions)
    }

    async fn moderate_submission(
        &self,
        id: i64,
        decision: ModerationDecision,
        notes: Option<&str>,
    ) -> Result<Submission, DbError> {
        let mut state = self.lock();

        let submission = state
            .submissions
            .get_mut(&id)
            .ok_or(DbError::NotFound { id })?;
        let status = submission
            .status
            .transition(decision)
            .map_err(|_| transition_error(submission.status, decision))?;

        submission.status = status;
        submission.moderator_notes = notes.map(String::from);
        submission.updated_at = Utc::now();
        let submission = submission.clone();

        if decision == ModerationDecision::Approve {
            state.insert_verified(&submission.parking_data);
        }

        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use cph_parking_models::ParkingType;

    use super::*;

    fn location(osm_id: &str, name: &str) -> NewParkingLocation {
        NewParkingLocation {
            osm_id: osm_id.to_string(),
            name: name.to_string(),
            address: None,
            latitude: 55.676,
            longitude: 12.568,
            operator: None,
            fee_info: "Paid parking".to_string(),
            opening_hours: None,
            capacity: Some(75),
            verified: false,
        }
    }

    fn data(name: &str) -> ParkingData {
        ParkingData {
            name: name.to_string(),
            address: Some("Nørregade 1".to_string()),
            latitude: 55.68,
            longitude: 12.57,
            parking_type: ParkingType::LongTerm,
            operator: None,
            fee_info: Some("Free".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let store = MemoryStore::new();
        assert_eq!(store.upsert_locations(&[]).await.unwrap(), 0);
        assert_eq!(store.upsert_calls(), 0);
        assert_eq!(store.location_count(), 0);
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = MemoryStore::new();
        let batch = vec![location("node/1", "A"), location("way/2", "B")];

        store.upsert_locations(&batch).await.unwrap();
        let first = store.list_locations().await.unwrap();
        store.upsert_locations(&batch).await.unwrap();
        let second = store.list_locations().await.unwrap();

        assert_eq!(second.len(), 2);
        assert_eq!(
            first.iter().map(|l| (l.id, l.created_at)).collect::<Vec<_>>(),
            second.iter().map(|l| (l.id, l.created_at)).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn upsert_updates_mutable_fields() {
        let store = MemoryStore::new();
        store
            .upsert_locations(&[location("node/1", "Old name")])
            .await
            .unwrap();

        let mut changed = location("node/1", "New name");
        changed.capacity = None;
        changed.operator = Some("APCOA".to_string());
        store.upsert_locations(&[changed]).await.unwrap();

        let locations = store.list_locations().await.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].name, "New name");
        assert_eq!(locations[0].capacity, None);
        assert_eq!(locations[0].operator.as_deref(), Some("APCOA"));
        assert_eq!(locations[0].osm_id.as_deref(), Some("node/1"));
    }

    #[tokio::test]
    async fn last_duplicate_in_batch_wins() {
        let store = MemoryStore::new();
        let written = store
            .upsert_locations(&[location("node/1", "first"), location("node/1", "second")])
            .await
            .unwrap();

        assert_eq!(written, 1);
        let locations = store.list_locations().await.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].name, "second");
    }

    #[tokio::test]
    async fn new_submission_is_pending() {
        let store = MemoryStore::new();
        let submission = store
            .insert_submission("user-1", &data("Cykelværkstedet"))
            .await
            .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Pending);
        assert_eq!(submission.moderator_notes, None);
        assert_eq!(
            store.get_submission(submission.id).await.unwrap(),
            Some(submission)
        );
        assert_eq!(store.get_submission(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn approving_adds_verified_location() {
        let store = MemoryStore::new();
        let submission = store
            .insert_submission("user-1", &data("Cykelværkstedet"))
            .await
            .unwrap();

        let approved = store
            .moderate_submission(submission.id, ModerationDecision::Approve, Some("Looks good"))
            .await
            .unwrap();
        assert_eq!(approved.status, SubmissionStatus::Approved);
        assert_eq!(approved.moderator_notes.as_deref(), Some("Looks good"));

        let locations = store.list_locations().await.unwrap();
        assert_eq!(locations.len(), 1);
        assert!(locations[0].verified);
        assert_eq!(locations[0].osm_id, None);
        assert_eq!(locations[0].parking_type, ParkingType::LongTerm);
        assert_eq!(locations[0].name, "Cykelværkstedet");
    }

    #[tokio::test]
    async fn rejecting_adds_nothing() {
        let store = MemoryStore::new();
        let submission = store.insert_submission("user-1", &data("X")).await.unwrap();

        let rejected = store
            .moderate_submission(submission.id, ModerationDecision::Reject, None)
            .await
            .unwrap();
        assert_eq!(rejected.status, SubmissionStatus::Rejected);
        assert_eq!(store.location_count(), 0);
    }

    #[tokio::test]
    async fn moderated_submission_cannot_change_again() {
        let store = MemoryStore::new();
        let submission = store.insert_submission("user-1", &data("X")).await.unwrap();
        store
            .moderate_submission(submission.id, ModerationDecision::Reject, None)
            .await
            .unwrap();

        let err = store
            .moderate_submission(submission.id, ModerationDecision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidTransition(_)));
        assert_eq!(store.location_count(), 0);
    }

    #[tokio::test]
    async fn unknown_submission_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .moderate_submission(42, ModerationDecision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { id: 42 }));
    }

    #[tokio::test]
    async fn lists_newest_first_and_filters_by_status() {
        let store = MemoryStore::new();
        let a = store.insert_submission("u", &data("A")).await.unwrap();
        let b = store.insert_submission("u", &data("B")).await.unwrap();
        let c = store.insert_submission("u", &data("C")).await.unwrap();
        store
            .moderate_submission(b.id, ModerationDecision::Approve, None)
            .await
            .unwrap();

        let all: Vec<i64> = store
            .list_submissions(None)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(all, vec![c.id, b.id, a.id]);

        let pending: Vec<i64> = store
            .list_submissions(Some(SubmissionStatus::Pending))
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(pending, vec![c.id, a.id]);
    }
}
