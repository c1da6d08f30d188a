//! HTTP handler functions for the notifier.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use cph_parking_notifier_models::{
    ApiEmailSent, ApiError, ApiHealth, SubmissionRecord, WebhookPayload,
};

use crate::email::build_notification;
use crate::{AppState, NotifyError};

/// What a webhook call ended up doing.
enum Outcome {
    Ignored,
    Sent(Option<String>),
}

/// `GET /health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        email_configured: state.gateway.is_some(),
    })
}

/// `OPTIONS /` for clients that preflight without CORS headers.
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

/// `POST /`
///
/// Receives a database webhook and emails the admin about new submissions.
pub async fn submission_webhook(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    match notify(&state, &body).await {
        Ok(Outcome::Ignored) => HttpResponse::Ok().body("Not a submission insert"),
        Ok(Outcome::Sent(email_id)) => {
            log::info!("Email sent successfully: {email_id:?}");
            HttpResponse::Ok().json(ApiEmailSent {
                message: "Email notification sent successfully".to_string(),
                email_id,
            })
        }
        Err(NotifyError::NotConfigured) => {
            log::error!("RESEND_API_KEY not configured");
            HttpResponse::InternalServerError().body("Email service not configured")
        }
        Err(NotifyError::Provider { status, body }) => {
            log::error!("Failed to send email ({status}): {body}");
            HttpResponse::InternalServerError().body(format!("Failed to send email: {body}"))
        }
        Err(e) => {
            log::error!("Error handling submission webhook: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: e.to_string(),
            })
        }
    }
}

async fn notify(state: &AppState, body: &[u8]) -> Result<Outcome, NotifyError> {
    let payload: WebhookPayload = serde_json::from_slice(body)?;
    if !payload.is_submission_insert() {
        log::debug!(
            "Ignoring {} on {}",
            payload.event_type,
            payload.table
        );
        return Ok(Outcome::Ignored);
    }

    let record: SubmissionRecord =
        serde_json::from_value(payload.record.ok_or(NotifyError::MissingRecord)?)?;

    let gateway = state.gateway.as_ref().ok_or(NotifyError::NotConfigured)?;

    let message = build_notification(
        &record.parking_data,
        &state.config.from_address,
        &state.config.admin_email,
        &state.config.site_url,
        record.created_at.unwrap_or_else(Utc::now),
    );

    log::info!(
        "Notifying {} about submission {:?}",
        state.config.admin_email,
        record.id
    );
    let email_id = gateway.send(&message).await?;
    Ok(Outcome::Sent(email_id))
}
