#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! OpenStreetMap fetch client and parking tag normalization.
//!
//! An [`ElementSource`] returns raw map elements in one request. Each
//! element is then mapped through [`normalize::normalize_element`] into a
//! `NewParkingLocation`, or skipped when it has no usable position. The
//! Overpass filter rules themselves are configuration, loaded from the
//! embedded TOML files in [`registry`].

pub mod normalize;
pub mod overpass;
pub mod query;
pub mod registry;

use async_trait::async_trait;
use cph_parking_source_models::RawMapElement;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The query service answered with a non-success status.
    #[error("Overpass API error: {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A query definition is malformed.
    #[error("Invalid query definition {id}: {message}")]
    Definition {
        /// Query id (file name for unparseable TOML).
        id: String,
        /// Description of what went wrong.
        message: String,
    },
}

/// Trait that all map-data sources must implement.
///
/// A source performs exactly one request per call and returns everything
/// it matched. There is no paging and no retry.
#[async_trait]
pub trait ElementSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., `"copenhagen"`).
    fn id(&self) -> &str;

    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetches all raw elements matched by this source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails, the service answers
    /// with a non-success status, or the body is not a valid response.
    async fn fetch_elements(&self) -> Result<Vec<RawMapElement>, SourceError>;
}
