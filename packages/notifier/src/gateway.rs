//! Email provider gateways.

use async_trait::async_trait;
use serde::Deserialize;

use crate::NotifyError;
use crate::email::EmailMessage;

/// Resend's send endpoint.
pub const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Something that can deliver an [`EmailMessage`].
#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Sends one message and returns the provider's message id, if any.
    async fn send(&self, message: &EmailMessage) -> Result<Option<String>, NotifyError>;
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Delivers email through the Resend HTTP API.
pub struct ResendGateway {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl ResendGateway {
    /// Creates a gateway authenticating with `api_key`.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: RESEND_ENDPOINT.to_string(),
        }
    }

    /// Sends to a different endpoint, e.g. a local mock.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl EmailGateway for ResendGateway {
    async fn send(&self, message: &EmailMessage) -> Result<Option<String>, NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let result: ResendResponse = response.json().await?;
        log::debug!("Mail provider accepted message {:?}", result.id);
        Ok(result.id)
    }
}
