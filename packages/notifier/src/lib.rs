#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web service that emails moderators when a parking submission is
//! created.
//!
//! The database calls the webhook for every change on the `submissions`
//! table; inserts are rendered into a Danish notification and handed to an
//! [`gateway::EmailGateway`]. Nothing is retried.

pub mod config;
pub mod email;
pub mod gateway;
mod handlers;

use std::sync::Arc;

use actix_web::http::Method;
use actix_web::web;

use crate::config::NotifierConfig;
use crate::gateway::EmailGateway;

/// Errors that can occur while handling a webhook.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// No email provider key is configured.
    #[error("Email service not configured")]
    NotConfigured,

    /// The request body is not a valid webhook payload.
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The webhook is a submission insert without a record.
    #[error("Submission insert without a record")]
    MissingRecord,

    /// The provider could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the message.
    #[error("Email provider error: {status}: {body}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

/// Shared application state.
pub struct AppState {
    /// Service configuration.
    pub config: NotifierConfig,
    /// Email provider, absent when no API key is configured.
    pub gateway: Option<Arc<dyn EmailGateway>>,
}

impl AppState {
    /// Builds the state, creating a Resend gateway when a key is present.
    #[must_use]
    pub fn from_config(config: NotifierConfig, client: reqwest::Client) -> Self {
        let gateway = config.resend_api_key.as_ref().map(|key| {
            Arc::new(gateway::ResendGateway::new(client, key.clone())) as Arc<dyn EmailGateway>
        });
        Self { config, gateway }
    }
}

/// Webhook paths; the second matches the name the database hook calls.
const WEBHOOK_PATHS: [&str; 2] = ["/", "/send-submission-email"];

/// Registers the notifier routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health));
    for path in WEBHOOK_PATHS {
        cfg.service(
            web::resource(path)
                .route(web::post().to(handlers::submission_webhook))
                .route(web::method(Method::OPTIONS).to(handlers::preflight)),
        );
    }
}
