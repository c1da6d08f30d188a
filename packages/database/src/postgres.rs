//! [`ParkingStore`] backed by Postgres through `switchy_database`.
//!
//! All statements are raw SQL with `$n` placeholders. Timestamps are stored
//! as UTC `TIMESTAMP` columns and the submission payload as `JSONB`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use cph_parking_models::{
    ModerationDecision, NewParkingLocation, ParkingData, ParkingLocation, ParkingType, Submission,
    SubmissionStatus,
};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, ParkingStore, dedupe_by_osm_id, transition_error};

/// Postgres limits a single statement to 65,535 bind parameters.
const PG_MAX_PARAMS: usize = 65_535;

/// Bind parameters per upserted location.
const PARAMS_PER_LOCATION: usize = 10;

const LOCATION_COLUMNS: &str = "id, osm_id, name, address, latitude, longitude, parking_type, \
     operator, fee_info, opening_hours, capacity, verified, created_at, updated_at";

const SUBMISSION_COLUMNS: &str = "id, user_id, parking_data::text AS parking_data, status, \
     moderator_notes, created_at, updated_at";

/// A [`ParkingStore`] over a `switchy_database` connection.
pub struct PostgresStore {
    db: Box<dyn Database>,
}

impl PostgresStore {
    /// Wraps an open connection.
    #[must_use]
    pub fn new(db: Box<dyn Database>) -> Self {
        Self { db }
    }

    /// Connects to `url` and wraps the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        Ok(Self::new(crate::db::connect(url).await?))
    }

    /// The underlying connection, for running migrations.
    #[must_use]
    pub fn database(&self) -> &dyn Database {
        self.db.as_ref()
    }

    async fn upsert_chunk(&self, chunk: &[&NewParkingLocation]) -> Result<u64, DbError> {
        let mut placeholders = Vec::with_capacity(chunk.len());
        let mut params = Vec::with_capacity(chunk.len() * PARAMS_PER_LOCATION);

        for (row, location) in chunk.iter().enumerate() {
            let base = row * PARAMS_PER_LOCATION;
            let slots: Vec<String> = (1..=PARAMS_PER_LOCATION)
                .map(|i| format!("${}", base + i))
                .collect();
            placeholders.push(format!("({})", slots.join(", ")));

            params.extend([
                DatabaseValue::String(location.osm_id.clone()),
                DatabaseValue::String(location.name.clone()),
                optional_string(location.address.as_deref()),
                DatabaseValue::Real64(location.latitude),
                DatabaseValue::Real64(location.longitude),
                optional_string(location.operator.as_deref()),
                DatabaseValue::String(location.fee_info.clone()),
                optional_string(location.opening_hours.as_deref()),
                location
                    .capacity
                    .map_or(DatabaseValue::Null, DatabaseValue::Int32),
                DatabaseValue::Bool(location.verified),
            ]);
        }

        let sql = format!(
            "INSERT INTO parking_locations (
                osm_id, name, address, latitude, longitude,
                operator, fee_info, opening_hours, capacity, verified
            ) VALUES {}
            ON CONFLICT (osm_id) DO UPDATE SET
                name = EXCLUDED.name,
                address = EXCLUDED.address,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                operator = EXCLUDED.operator,
                fee_info = EXCLUDED.fee_info,
                opening_hours = EXCLUDED.opening_hours,
                capacity = EXCLUDED.capacity,
                verified = EXCLUDED.verified,
                updated_at = NOW() AT TIME ZONE 'utc'",
            placeholders.join(", ")
        );

        Ok(self.db.exec_raw_params(&sql, &params).await?)
    }
}

#[async_trait]
impl ParkingStore for PostgresStore {
    async fn upsert_locations(&self, locations: &[NewParkingLocation]) -> Result<u64, DbError> {
        if locations.is_empty() {
            return Ok(0);
        }

        let deduped = dedupe_by_osm_id(locations);
        if deduped.len() < locations.len() {
            log::debug!(
                "Collapsed {} duplicate osm_id(s) in batch",
                locations.len() - deduped.len()
            );
        }

        let chunk_size = PG_MAX_PARAMS / PARAMS_PER_LOCATION;
        let mut written = 0u64;
        for chunk in deduped.chunks(chunk_size) {
            written += self.upsert_chunk(chunk).await?;
        }

        Ok(written)
    }

    async fn list_locations(&self) -> Result<Vec<ParkingLocation>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                &format!("SELECT {LOCATION_COLUMNS} FROM parking_locations ORDER BY id"),
                &[],
            )
            .await?;

        rows.iter().map(location_from_row).collect()
    }

    async fn insert_submission(
        &self,
        user_id: &str,
        data: &ParkingData,
    ) -> Result<Submission, DbError> {
        let payload = serde_json::to_string(data)?;
        let rows = self
            .db
            .query_raw_params(
                &format!(
                    "INSERT INTO submissions (user_id, parking_data, status)
                     VALUES ($1, $2::jsonb, 'pending')
                     RETURNING {SUBMISSION_COLUMNS}"
                ),
                &[
                    DatabaseValue::String(user_id.to_string()),
                    DatabaseValue::String(payload),
                ],
            )
            .await?;

        let row = rows.first().ok_or_else(|| DbError::Conversion {
            message: "No row returned from submission insert".to_string(),
        })?;
        submission_from_row(row)
    }

    async fn get_submission(&self, id: i64) -> Result<Option<Submission>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                &format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"),
                &[DatabaseValue::Int64(id)],
            )
            .await?;

        rows.first().map(submission_from_row).transpose()
    }

    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, DbError> {
        let rows = match status {
            Some(status) => {
                self.db
                    .query_raw_params(
                        &format!(
                            "SELECT {SUBMISSION_COLUMNS} FROM submissions
                             WHERE status = $1
                             ORDER BY created_at DESC, id DESC"
                        ),
                        &[DatabaseValue::String(status.to_string())],
                    )
                    .await?
            }
            None => {
                self.db
                    .query_raw_params(
                        &format!(
                            "SELECT {SUBMISSION_COLUMNS} FROM submissions
                             ORDER BY created_at DESC, id DESC"
                        ),
                        &[],
                    )
                    .await?
            }
        };

        rows.iter().map(submission_from_row).collect()
    }

    async fn moderate_submission(
        &self,
        id: i64,
        decision: ModerationDecision,
        notes: Option<&str>,
    ) -> Result<Submission, DbError> {
        let txn = self.db.begin_transaction().await?;

        match apply_decision(txn.as_ref(), id, decision, notes).await {
            Ok(Some(submission)) => {
                txn.commit().await?;
                log::info!("Submission {id} {}", submission.status);
                Ok(submission)
            }
            Ok(None) => {
                txn.rollback().await?;
                match self.get_submission(id).await? {
                    Some(existing) => Err(transition_error(existing.status, decision)),
                    None => Err(DbError::NotFound { id }),
                }
            }
            Err(e) => {
                log::error!("Failed to {decision} submission {id}, nothing was changed: {e}");
                if let Err(rollback) = txn.rollback().await {
                    log::warn!("Rollback for submission {id} failed: {rollback}");
                }
                Err(e)
            }
        }
    }
}

/// Moves a pending submission to the decided status and, on approval, adds
/// its location. Returns `None` when no pending row matched.
async fn apply_decision(
    db: &dyn Database,
    id: i64,
    decision: ModerationDecision,
    notes: Option<&str>,
) -> Result<Option<Submission>, DbError> {
    // Guarded on status so two moderators cannot both win.
    let rows = db
        .query_raw_params(
            &format!(
                "UPDATE submissions
                 SET status = $2, moderator_notes = $3,
                     updated_at = NOW() AT TIME ZONE 'utc'
                 WHERE id = $1 AND status = 'pending'
                 RETURNING {SUBMISSION_COLUMNS}"
            ),
            &[
                DatabaseValue::Int64(id),
                DatabaseValue::String(decision.target_status().to_string()),
                optional_string(notes),
            ],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };
    let submission = submission_from_row(row)?;

    if decision == ModerationDecision::Approve {
        insert_verified_location(db, &submission.parking_data).await?;
    }

    Ok(Some(submission))
}

async fn insert_verified_location(db: &dyn Database, data: &ParkingData) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT INTO parking_locations (
            name, address, latitude, longitude, parking_type,
            operator, fee_info, verified
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)",
        &[
            DatabaseValue::String(data.name.clone()),
            optional_string(data.address.as_deref()),
            DatabaseValue::Real64(data.latitude),
            DatabaseValue::Real64(data.longitude),
            DatabaseValue::String(data.parking_type.to_string()),
            optional_string(data.operator.as_deref()),
            optional_string(data.fee_info.as_deref()),
        ],
    )
    .await?;
    Ok(())
}

fn optional_string(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |v| DatabaseValue::String(v.to_string()))
}

fn conversion<E: std::fmt::Display>(column: &'static str) -> impl Fn(E) -> DbError {
    move |e| DbError::Conversion {
        message: format!("Failed to read {column}: {e}"),
    }
}

fn location_from_row(row: &switchy_database::Row) -> Result<ParkingLocation, DbError> {
    let parking_type: String = row.to_value("parking_type").unwrap_or_default();
    let created_at: NaiveDateTime = row.to_value("created_at").map_err(conversion("created_at"))?;
    let updated_at: NaiveDateTime = row.to_value("updated_at").map_err(conversion("updated_at"))?;

    Ok(ParkingLocation {
        id: row.to_value("id").map_err(conversion("id"))?,
        osm_id: row.to_value("osm_id").unwrap_or(None),
        name: row.to_value("name").map_err(conversion("name"))?,
        address: row.to_value("address").unwrap_or(None),
        latitude: row.to_value("latitude").map_err(conversion("latitude"))?,
        longitude: row.to_value("longitude").map_err(conversion("longitude"))?,
        parking_type: parking_type.parse::<ParkingType>().unwrap_or_default(),
        operator: row.to_value("operator").unwrap_or(None),
        fee_info: row.to_value("fee_info").unwrap_or(None),
        opening_hours: row.to_value("opening_hours").unwrap_or(None),
        capacity: row.to_value("capacity").unwrap_or(None),
        verified: row.to_value("verified").unwrap_or(false),
        created_at: created_at.and_utc(),
        updated_at: updated_at.and_utc(),
    })
}

fn submission_from_row(row: &switchy_database::Row) -> Result<Submission, DbError> {
    let payload: String = row
        .to_value("parking_data")
        .map_err(conversion("parking_data"))?;
    let status: String = row.to_value("status").map_err(conversion("status"))?;
    let created_at: NaiveDateTime = row.to_value("created_at").map_err(conversion("created_at"))?;
    let updated_at: NaiveDateTime = row.to_value("updated_at").map_err(conversion("updated_at"))?;

    Ok(Submission {
        id: row.to_value("id").map_err(conversion("id"))?,
        user_id: row.to_value("user_id").map_err(conversion("user_id"))?,
        parking_data: serde_json::from_str(&payload)?,
        status: status
            .parse::<SubmissionStatus>()
            .map_err(conversion("status"))?,
        moderator_notes: row.to_value("moderator_notes").unwrap_or(None),
        created_at: created_at.and_utc(),
        updated_at: updated_at.and_utc(),
    })
}
