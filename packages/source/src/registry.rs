//! Query registry: loads all query definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/queries/` is baked into the binary
//! at compile time via [`include_str!`]. Covering another city means adding
//! a TOML file and listing it below.

use crate::SourceError;
use crate::query::QueryDefinition;

/// TOML configs embedded at compile time.
const QUERY_TOMLS: &[(&str, &str)] = &[("copenhagen", include_str!("../queries/copenhagen.toml"))];

/// Id of the query used when none is requested explicitly.
pub const DEFAULT_QUERY_ID: &str = "copenhagen";

/// Parses and validates a single TOML query definition.
///
/// # Errors
///
/// Returns [`SourceError::Definition`] if the TOML does not parse or the
/// definition fails [`QueryDefinition::validate`].
pub fn parse_query_toml(name: &str, toml_str: &str) -> Result<QueryDefinition, SourceError> {
    let definition: QueryDefinition =
        toml::de::from_str(toml_str).map_err(|e| SourceError::Definition {
            id: name.to_string(),
            message: e.to_string(),
        })?;
    definition.validate()?;
    Ok(definition)
}

/// Returns all configured query definitions, parsed from embedded TOML.
///
/// # Errors
///
/// Returns [`SourceError::Definition`] if any embedded config is malformed.
pub fn all_queries() -> Result<Vec<QueryDefinition>, SourceError> {
    QUERY_TOMLS
        .iter()
        .map(|(name, toml)| parse_query_toml(name, toml))
        .collect()
}

/// Looks up a query definition by id.
///
/// # Errors
///
/// Returns [`SourceError::Definition`] if no query has this id or the
/// embedded configs are malformed.
pub fn find_query(id: &str) -> Result<QueryDefinition, SourceError> {
    all_queries()?
        .into_iter()
        .find(|q| q.id == id)
        .ok_or_else(|| SourceError::Definition {
            id: id.to_string(),
            message: format!(
                "unknown query; available: {}",
                QUERY_TOMLS
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
}

/// Returns the default (Copenhagen) query definition.
///
/// # Errors
///
/// Returns [`SourceError::Definition`] if the embedded config is malformed.
pub fn default_query() -> Result<QueryDefinition, SourceError> {
    find_query(DEFAULT_QUERY_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::build_query;

    #[test]
    fn loads_all_queries() {
        let queries = all_queries().unwrap();
        assert_eq!(queries.len(), QUERY_TOMLS.len());
    }

    #[test]
    fn query_ids_match_file_names() {
        for (name, toml) in QUERY_TOMLS {
            assert_eq!(parse_query_toml(name, toml).unwrap().id, *name);
        }
    }

    #[test]
    fn copenhagen_reproduces_literal_filters() {
        let query = build_query(&default_query().unwrap());
        let bbox = "(55.6000,12.4500,55.7500,12.7000);";

        for expected in [
            r#"nwr["amenity"="parking"]["capacity"~"^[5-9][0-9]|^[0-9]{3,}$"]"#,
            r#"nwr["building"="parking"]["parking"~"multi-storey|underground"]"#,
            r#"nwr["operator"~"APCOA|Q-Park|Jeudan|Parkzone|Gardian|Borgergade"]"#,
            r#"nwr["brand"~"APCOA|Q-Park|Jeudan|Parkzone|Gardian|Borgergade"]"#,
            r#"nwr["name"~"P-hus|P-kælder|Parkering"]"#,
            r#"nwr["name"~"Magasin|Vesterport|Vognmagergade|Axel Towers|Tivoli|Dronningens|Gammel Mønt|Berlingske"]"#,
        ] {
            assert!(query.contains(&format!("{expected}{bbox}")), "missing {expected}");
        }
        assert!(query.starts_with("[out:json][timeout:25];"));
    }

    #[test]
    fn unknown_query_is_an_error() {
        let err = find_query("aarhus").unwrap_err();
        assert!(err.to_string().contains("copenhagen"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            parse_query_toml("broken", "id = "),
            Err(SourceError::Definition { .. })
        ));
    }
}
