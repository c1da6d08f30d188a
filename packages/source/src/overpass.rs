//! Overpass API fetch client.
//!
//! Sends one form-encoded POST with the rendered query and decodes the
//! `elements` array. Any non-success status or undecodable body is fatal
//! for the run; there is no retry.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API>

use async_trait::async_trait;
use cph_parking_source_models::{OverpassResponse, RawMapElement};

use crate::query::{QueryDefinition, build_query};
use crate::{ElementSource, SourceError};

/// User agent sent with every request, as the public instance asks for.
const USER_AGENT: &str = concat!("cph-parking/", env!("CARGO_PKG_VERSION"));

/// Maximum length of the response body kept in error messages.
const BODY_PREVIEW_LEN: usize = 500;

/// An [`ElementSource`] backed by an Overpass interpreter.
pub struct OverpassClient {
    client: reqwest::Client,
    definition: QueryDefinition,
}

impl OverpassClient {
    /// Creates a client for the given query definition.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(definition: QueryDefinition) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, definition))
    }

    /// Creates a source that reuses an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, definition: QueryDefinition) -> Self {
        Self { client, definition }
    }

    /// The query definition this client runs.
    #[must_use]
    pub const fn definition(&self) -> &QueryDefinition {
        &self.definition
    }
}

#[async_trait]
impl ElementSource for OverpassClient {
    fn id(&self) -> &str {
        &self.definition.id
    }

    fn name(&self) -> &str {
        &self.definition.name
    }

    async fn fetch_elements(&self) -> Result<Vec<RawMapElement>, SourceError> {
        let query = build_query(&self.definition);
        log::info!(
            "Fetching {} from {}",
            self.definition.name,
            self.definition.endpoint
        );
        log::debug!("Overpass query:\n{query}");

        let response = self
            .client
            .post(&self.definition.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let body = response.text().await?;
        let elements = parse_response(&body)?;
        log::info!("Found {} parking elements from OSM", elements.len());
        Ok(elements)
    }
}

/// Decodes an Overpass JSON body into its elements.
///
/// # Errors
///
/// Returns [`SourceError::Json`] if the body is not JSON or has no
/// `elements` array.
pub fn parse_response(body: &str) -> Result<Vec<RawMapElement>, SourceError> {
    let response: OverpassResponse = serde_json::from_str(body)?;
    if let Some(remark) = &response.remark {
        log::warn!("Overpass returned a remark, results may be incomplete: {remark}");
    }
    Ok(response.elements)
}

/// Truncates a body for inclusion in an error message.
fn preview(body: &str) -> String {
    if body.len() <= BODY_PREVIEW_LEN {
        return body.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
