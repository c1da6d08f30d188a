//! Config-driven Overpass query definition.
//!
//! [`QueryDefinition`] captures the bounding box and the literal filter
//! patterns for one city. [`build_query`] renders it into Overpass QL.
//! The patterns are data, not logic: nothing here adds filtering beyond
//! what the definition lists.

use cph_parking_source_models::BoundingBox;
use serde::Deserialize;

use crate::SourceError;

/// Default server-side timeout, in seconds.
const DEFAULT_TIMEOUT_SECS: u32 = 25;

const fn default_timeout_secs() -> u32 {
    DEFAULT_TIMEOUT_SECS
}

/// A complete Overpass query definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryDefinition {
    /// Unique identifier (e.g., `"copenhagen"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Overpass interpreter URL.
    pub endpoint: String,
    /// `[timeout:N]` setting sent with the query.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,
    /// Area to search.
    pub bbox: BoundingBox,
    /// Which elements to match.
    pub filters: FilterRules,
}

/// The literal match rules of a query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterRules {
    /// Regex on the `capacity` tag selecting large facilities.
    pub capacity_pattern: String,
    /// Values of the `parking` tag for structured facilities
    /// (`multi-storey`, `underground`).
    #[serde(default)]
    pub parking_structures: Vec<String>,
    /// Operator/brand names of commercial operators.
    #[serde(default)]
    pub operators: Vec<String>,
    /// Name fragments that mark a parking facility (`P-hus`).
    #[serde(default)]
    pub facility_name_patterns: Vec<String>,
    /// Names of specific known facilities.
    #[serde(default)]
    pub known_facilities: Vec<String>,
}

impl QueryDefinition {
    /// Checks the definition for values that would produce a broken or
    /// unbounded query.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Definition`] if the bounding box is empty or
    /// out of range, the endpoint is not an HTTP(S) URL, or the capacity
    /// pattern is not a valid regular expression.
    pub fn validate(&self) -> Result<(), SourceError> {
        let invalid = |message: String| SourceError::Definition {
            id: self.id.clone(),
            message,
        };

        if !self.bbox.is_valid() {
            return Err(invalid(format!("bounding box {:?} is empty or out of range", self.bbox)));
        }
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(invalid(format!("endpoint {} is not an HTTP URL", self.endpoint)));
        }
        if self.filters.capacity_pattern.is_empty() {
            return Err(invalid("capacity_pattern is empty".to_string()));
        }
        regex::Regex::new(&self.filters.capacity_pattern)
            .map_err(|e| invalid(format!("capacity_pattern: {e}")))?;

        Ok(())
    }
}

/// Escapes a value for use inside a double-quoted Overpass QL string.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Joins literal alternatives into one regex alternation.
fn alternation(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote(v))
        .collect::<Vec<_>>()
        .join("|")
}

/// Renders a query definition into Overpass QL.
///
/// Every statement is clipped to the bounding box and the union is output
/// with `out center meta`, so ways and relations carry a computed center.
/// Empty filter lists are left out rather than rendered as a match-all
/// regex.
#[must_use]
pub fn build_query(definition: &QueryDefinition) -> String {
    let bbox = definition.bbox.to_overpass();
    let filters = &definition.filters;
    let capacity = quote(&filters.capacity_pattern);

    let mut statements = vec![
        format!(r#"nwr["amenity"="parking"]["capacity"~"{capacity}"]"#),
        format!(r#"nwr["building"="parking"]["capacity"~"{capacity}"]"#),
    ];

    if !filters.parking_structures.is_empty() {
        let structures = alternation(&filters.parking_structures);
        statements.push(format!(r#"nwr["amenity"="parking"]["parking"~"{structures}"]"#));
        statements.push(format!(r#"nwr["building"="parking"]["parking"~"{structures}"]"#));
    }

    if !filters.operators.is_empty() {
        let operators = alternation(&filters.operators);
        statements.push(format!(r#"nwr["operator"~"{operators}"]"#));
        statements.push(format!(r#"nwr["brand"~"{operators}"]"#));
    }

    statements.push(r#"nwr["building"="parking"]"#.to_string());
    statements.push(r#"nwr["amenity"="parking"]["name"]"#.to_string());

    if !filters.facility_name_patterns.is_empty() {
        let names = alternation(&filters.facility_name_patterns);
        statements.push(format!(r#"nwr["name"~"{names}"]"#));
    }

    if !filters.known_facilities.is_empty() {
        let names = alternation(&filters.known_facilities);
        statements.push(format!(r#"nwr["name"~"{names}"]"#));
    }

    let body = statements
        .iter()
        .map(|s| format!("  {s}({bbox});"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "[out:json][timeout:{}];\n(\n{body}\n);\nout center meta;\n",
        definition.timeout_secs
    )
}
