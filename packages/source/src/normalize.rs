//! Maps raw OpenStreetMap elements onto [`NewParkingLocation`] records.
//!
//! Normalization never fails: an element without a usable position is
//! skipped (`None`), and a malformed optional tag leaves its field empty.

use cph_parking_models::{DEFAULT_FEE_INFO, DEFAULT_LOCATION_NAME, NewParkingLocation};
use cph_parking_source_models::{RawMapElement, Tags};

/// Name tags in resolution order.
const NAME_TAGS: &[&str] = &["name:da", "name:en", "name"];

/// Fee tags in resolution order.
const FEE_TAGS: &[&str] = &["charge", "fee:conditional"];

/// Address tags in output order.
const ADDRESS_TAGS: &[&str] = &["addr:street", "addr:housenumber", "addr:city"];

/// Normalizes one element, or returns `None` when it has neither direct
/// nor center coordinates.
#[must_use]
pub fn normalize_element(element: &RawMapElement) -> Option<NewParkingLocation> {
    let Some(position) = element.coordinates() else {
        log::debug!("Skipping {}: no coordinates", element.source_id());
        return None;
    };

    let tags = &element.tags;

    Some(NewParkingLocation {
        osm_id: element.source_id(),
        name: tags
            .first_of(NAME_TAGS)
            .unwrap_or(DEFAULT_LOCATION_NAME)
            .to_string(),
        address: build_address(tags),
        latitude: position.lat,
        longitude: position.lon,
        operator: tags.get_non_empty("operator").map(String::from),
        fee_info: tags.first_of(FEE_TAGS).unwrap_or(DEFAULT_FEE_INFO).to_string(),
        opening_hours: tags.get_non_empty("opening_hours").map(String::from),
        capacity: tags.get("capacity").and_then(parse_capacity),
        verified: false,
    })
}

/// Normalizes a batch, dropping skipped elements.
#[must_use]
pub fn normalize_elements(elements: &[RawMapElement]) -> Vec<NewParkingLocation> {
    elements.iter().filter_map(normalize_element).collect()
}

/// Joins the present address tags with single spaces.
fn build_address(tags: &Tags) -> Option<String> {
    let parts: Vec<&str> = ADDRESS_TAGS
        .iter()
        .filter_map(|key| tags.get_non_empty(key))
        .map(str::trim)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Parses a `capacity` tag. Anything but a plain non-negative integer
/// yields `None`.
fn parse_capacity(value: &str) -> Option<i32> {
    value.trim().parse::<i32>().ok().filter(|c| *c >= 0)
}
