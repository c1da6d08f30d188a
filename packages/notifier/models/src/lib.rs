#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and response types for the submission notifier.
//!
//! The inbound shape is the database webhook envelope
//! (`{ type, table, schema, record }`). Only `record` is specific to the
//! `submissions` table, so it is kept as raw JSON until the envelope says
//! it is a submission insert.

use chrono::{DateTime, NaiveDateTime, Utc};
use cph_parking_models::ParkingData;
use serde::{Deserialize, Serialize};

/// Table whose inserts trigger a notification.
pub const SUBMISSIONS_TABLE: &str = "submissions";

/// Webhook event type for new rows.
pub const INSERT_EVENT: &str = "INSERT";

/// A database change notification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookPayload {
    /// `INSERT`, `UPDATE` or `DELETE`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Table the change happened on.
    pub table: String,
    /// Schema of the table.
    #[serde(default)]
    pub schema: Option<String>,
    /// The new row, if any.
    #[serde(default)]
    pub record: Option<serde_json::Value>,
}

impl WebhookPayload {
    /// Whether this event is a new row in the submissions table.
    #[must_use]
    pub fn is_submission_insert(&self) -> bool {
        self.event_type == INSERT_EVENT && self.table == SUBMISSIONS_TABLE
    }
}

/// The parts of a `submissions` row the notification uses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmissionRecord {
    /// Row id; numeric or UUID depending on the schema.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// What the user submitted.
    pub parking_data: ParkingData,
    /// Moderation status at insert time.
    #[serde(default)]
    pub status: Option<String>,
    /// When the row was created. `None` when absent or unparseable.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Zone-less layouts, read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a row timestamp as the database may serialize it: RFC 3339,
/// Postgres `timestamptz` text (`2025-03-04 09:15:00+00`), or a zone-less
/// `timestamp` taken to be UTC.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(at.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|at| at.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(serde_json::Value::as_str).and_then(parse_timestamp))
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Whether an email provider key is configured.
    pub email_configured: bool,
}

/// Response after a notification was handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEmailSent {
    /// Human-readable outcome.
    pub message: String,
    /// Provider message id.
    pub email_id: Option<String>,
}

/// Error body for failed requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// What went wrong.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use cph_parking_models::ParkingType;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_supabase_insert() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "type": "INSERT",
            "table": "submissions",
            "schema": "public",
            "record": {
                "id": "7f1c2b9e-1111-4222-8333-944445555666",
                "user_id": "u-1",
                "parking_data": {
                    "name": "Cykelværkstedet",
                    "latitude": 55.68,
                    "longitude": 12.57,
                    "parking_type": "long-term"
                },
                "status": "pending",
                "created_at": "2025-03-04T09:15:00.123456+00:00"
            },
            "old_record": null
        }))
        .unwrap();

        assert!(payload.is_submission_insert());
        let record: SubmissionRecord = serde_json::from_value(payload.record.unwrap()).unwrap();
        assert_eq!(record.parking_data.parking_type, ParkingType::LongTerm);
        assert_eq!(record.status.as_deref(), Some("pending"));
        assert!(record.created_at.is_some());
    }

    #[test]
    fn parses_timestamps_with_and_without_offset() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 4, 9, 15, 0).unwrap();

        for value in [
            "2025-03-04T09:15:00Z",
            "2025-03-04T10:15:00+01:00",
            "2025-03-04 09:15:00+00",
            "2025-03-04T09:15:00",
            "2025-03-04 09:15:00",
        ] {
            assert_eq!(parse_timestamp(value), Some(expected), "{value}");
        }

        let fractional = parse_timestamp("2025-03-04T09:15:00.123456").unwrap();
        assert_eq!(fractional.timestamp_subsec_micros(), 123_456);

        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn bad_created_at_does_not_fail_the_record() {
        for created_at in [json!("not a date"), json!(1_741_079_700), json!(null)] {
            let record: SubmissionRecord = serde_json::from_value(json!({
                "parking_data": { "name": "X", "latitude": 55.0, "longitude": 12.0 },
                "created_at": created_at
            }))
            .unwrap();
            assert_eq!(record.created_at, None);
        }
    }

    #[test]
    fn other_events_are_not_submission_inserts() {
        let update: WebhookPayload = serde_json::from_value(serde_json::json!({
            "type": "UPDATE",
            "table": "submissions",
            "schema": "public",
            "record": {}
        }))
        .unwrap();
        assert!(!update.is_submission_insert());

        let other_table: WebhookPayload = serde_json::from_value(serde_json::json!({
            "type": "INSERT",
            "table": "parking_locations",
            "schema": "public"
        }))
        .unwrap();
        assert!(!other_table.is_submission_insert());
    }

    #[test]
    fn email_sent_uses_camel_case() {
        let json = serde_json::to_value(ApiEmailSent {
            message: "Email notification sent successfully".to_string(),
            email_id: Some("abc".to_string()),
        })
        .unwrap();
        assert_eq!(json["emailId"], "abc");
    }
}
