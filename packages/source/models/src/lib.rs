#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw map-data types as returned by the Overpass API.
//!
//! These mirror the JSON shape of an Overpass `[out:json]` response closely
//! enough to deserialize it directly. Normalization into
//! `NewParkingLocation` happens in `cph_parking_source`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The kind of an OpenStreetMap element.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum ElementKind {
    /// A single point.
    Node,
    /// An ordered list of nodes (roads, building outlines).
    Way,
    /// A group of other elements.
    Relation,
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// Free-form OSM tags.
///
/// Lookups are total: a missing key yields `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// Creates an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the value for `key` unless it is missing or blank.
    #[must_use]
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Returns the first non-blank value among `keys`, in order.
    #[must_use]
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get_non_empty(key))
    }

    /// Sets a tag, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One element of an Overpass response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMapElement {
    /// Node, way or relation.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// OSM id, unique per kind.
    pub id: i64,
    /// Direct latitude (nodes).
    #[serde(default)]
    pub lat: Option<f64>,
    /// Direct longitude (nodes).
    #[serde(default)]
    pub lon: Option<f64>,
    /// Computed center (ways and relations, with `out center`).
    #[serde(default)]
    pub center: Option<Coordinates>,
    /// Element tags.
    #[serde(default)]
    pub tags: Tags,
}

impl RawMapElement {
    /// The external source id, `"<kind>/<id>"`.
    #[must_use]
    pub fn source_id(&self) -> String {
        format!("{}/{}", self.kind, self.id)
    }

    /// Resolves the element position: direct coordinates first, then the
    /// computed center.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            return Some(Coordinates { lat, lon });
        }
        self.center
    }
}

/// The top-level shape of an Overpass JSON response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverpassResponse {
    /// All matched elements.
    pub elements: Vec<RawMapElement>,
    /// Set by Overpass when the query ran into a runtime error (for example
    /// a timeout) and the element list may be incomplete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude boundary.
    pub south: f64,
    /// Western longitude boundary.
    pub west: f64,
    /// Northern latitude boundary.
    pub north: f64,
    /// Eastern longitude boundary.
    pub east: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Formats the box the way Overpass QL expects it:
    /// `south,west,north,east`.
    #[must_use]
    pub fn to_overpass(&self) -> String {
        format!(
            "{:.4},{:.4},{:.4},{:.4}",
            self.south, self.west, self.north, self.east
        )
    }

    /// Whether the box has a positive area.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.south < self.north
            && self.west < self.east
            && (-90.0..=90.0).contains(&self.south)
            && (-90.0..=90.0).contains(&self.north)
            && (-180.0..=180.0).contains(&self.west)
            && (-180.0..=180.0).contains(&self.east)
    }
}
