#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Parking location and submission types.
//!
//! Every parking location in the directory, whether imported from
//! OpenStreetMap or created by approving a user submission, is described by
//! the types in this crate. User submissions carry a [`SubmissionStatus`]
//! that only an administrator can move out of [`SubmissionStatus::Pending`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Name used when an imported element carries no usable name tag.
pub const DEFAULT_LOCATION_NAME: &str = "Unnamed Parking";

/// Fee description used when an imported element carries no fee tags.
pub const DEFAULT_FEE_INFO: &str = "Paid parking";

/// Whether a location is meant for short visits or long-term storage.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ParkingType {
    /// Car parks, garages and street parking.
    #[default]
    ShortTerm,
    /// Long-term storage (bike shops and similar).
    LongTerm,
}

/// A parking location as stored in the `parking_locations` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingLocation {
    /// Database primary key.
    pub id: i64,
    /// External source id (`"way/123"`). `None` for locations created from
    /// approved submissions.
    pub osm_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Street address, if known.
    pub address: Option<String>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Short- or long-term parking.
    pub parking_type: ParkingType,
    /// Operating company (e.g. "Q-Park").
    pub operator: Option<String>,
    /// Free-form fee description.
    pub fee_info: Option<String>,
    /// Opening hours in OSM syntax.
    pub opening_hours: Option<String>,
    /// Number of spaces.
    pub capacity: Option<i32>,
    /// `true` once a human has confirmed the location.
    pub verified: bool,
    /// When the row was first inserted.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

/// A parking location ready to be written, before storage assigns an id
/// and timestamps.
///
/// Produced by normalizing OpenStreetMap elements. The `osm_id` is the
/// conflict key for upserts, so importing the same element twice updates
/// one row instead of creating two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewParkingLocation {
    /// External source id (`"<kind>/<numericId>"`).
    pub osm_id: String,
    /// Display name.
    pub name: String,
    /// Street address assembled from `addr:*` tags.
    pub address: Option<String>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Operating company.
    pub operator: Option<String>,
    /// Fee description.
    pub fee_info: String,
    /// Opening hours in OSM syntax.
    pub opening_hours: Option<String>,
    /// Number of spaces.
    pub capacity: Option<i32>,
    /// Always `false` for imported data.
    pub verified: bool,
}

/// The location a user proposes in a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingData {
    /// Proposed display name.
    pub name: String,
    /// Street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Short- or long-term parking.
    #[serde(default)]
    pub parking_type: ParkingType,
    /// Operating company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Fee description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_info: Option<String>,
    /// Free-form notes for the moderator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Moderation state of a [`Submission`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubmissionStatus {
    /// Waiting for a moderator.
    #[default]
    Pending,
    /// Accepted; the location has been added to the directory.
    Approved,
    /// Declined by a moderator.
    Rejected,
}

/// A moderator's verdict on a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ModerationDecision {
    /// Accept the submission.
    Approve,
    /// Decline the submission.
    Reject,
}

impl ModerationDecision {
    /// The status a submission ends up in after this decision.
    #[must_use]
    pub const fn target_status(self) -> SubmissionStatus {
        match self {
            Self::Approve => SubmissionStatus::Approved,
            Self::Reject => SubmissionStatus::Rejected,
        }
    }
}

/// Error returned when a submission cannot move to the requested status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransitionError {
    /// Status the submission is currently in.
    pub from: SubmissionStatus,
    /// Status that was requested.
    pub to: SubmissionStatus,
}

impl std::fmt::Display for InvalidTransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid submission transition {} -> {}: only pending submissions can be moderated",
            self.from, self.to
        )
    }
}

impl std::error::Error for InvalidTransitionError {}

impl SubmissionStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Applies a moderation decision.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] unless the submission is
    /// [`SubmissionStatus::Pending`].
    pub const fn transition(
        self,
        decision: ModerationDecision,
    ) -> Result<Self, InvalidTransitionError> {
        let to = decision.target_status();
        match self {
            Self::Pending => Ok(to),
            Self::Approved | Self::Rejected => Err(InvalidTransitionError { from: self, to }),
        }
    }
}

/// A user-submitted location awaiting (or past) moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Database primary key.
    pub id: i64,
    /// Id of the submitting user in the auth service.
    pub user_id: String,
    /// The proposed location.
    pub parking_data: ParkingData,
    /// Moderation state.
    pub status: SubmissionStatus,
    /// Notes left by the moderator.
    pub moderator_notes: Option<String>,
    /// When the submission was created.
    pub created_at: DateTime<Utc>,
    /// When the submission was last modified.
    pub updated_at: DateTime<Utc>,
}
