#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the parking import.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Name of the query that was run.
    pub source_name: String,
    /// Raw elements returned by the query service.
    pub fetched: u64,
    /// Elements that normalized into a location.
    pub accepted: u64,
    /// Elements dropped for lack of coordinates.
    pub skipped: u64,
    /// Rows written by the store.
    pub upserted: u64,
    /// Accepted locations with an operator.
    pub with_operator: u64,
    /// Accepted locations with a capacity.
    pub with_capacity: u64,
    /// Accepted locations with opening hours.
    pub with_opening_hours: u64,
    /// How long the import took.
    pub duration: Duration,
}

impl ImportSummary {
    /// Whether the run found nothing to store.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.accepted == 0
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Import summary ({})", self.source_name)?;
        writeln!(f, "  Fetched:            {}", self.fetched)?;
        writeln!(f, "  Total locations:    {}", self.accepted)?;
        writeln!(f, "  Skipped:            {}", self.skipped)?;
        writeln!(f, "  Upserted:           {}", self.upserted)?;
        writeln!(f, "  With operators:     {}", self.with_operator)?;
        writeln!(f, "  With capacity:      {}", self.with_capacity)?;
        writeln!(f, "  With opening hours: {}", self.with_opening_hours)?;
        write!(f, "  Duration:           {:.1}s", self.duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_summary_is_empty() {
        let summary = ImportSummary::default();
        assert!(summary.is_empty());
        assert_eq!(summary.upserted, 0);
    }

    #[test]
    fn display_lists_counts() {
        let summary = ImportSummary {
            source_name: "Copenhagen parking".to_string(),
            fetched: 10,
            accepted: 8,
            skipped: 2,
            upserted: 8,
            with_operator: 3,
            with_capacity: 5,
            with_opening_hours: 1,
            duration: Duration::from_millis(1_500),
        };
        let text = summary.to_string();
        assert!(text.starts_with("Import summary (Copenhagen parking)"));
        assert!(text.contains("Total locations:    8"));
        assert!(text.contains("With capacity:      5"));
        assert!(text.ends_with("1.5s"));
    }

    #[test]
    fn serializes_counts() {
        let json = serde_json::to_value(ImportSummary::default()).unwrap();
        assert_eq!(json["fetched"], 0);
        assert!(json.get("duration").is_some());
    }
}
