//! Renders the moderator notification for a new submission.
//!
//! The message is Danish. Every user-supplied value is HTML-escaped before
//! it is placed in the body.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use cph_parking_models::{ParkingData, ParkingType};
use serde::Serialize;

const NO_ADDRESS: &str = "Ingen adresse angivet";
const NOT_SPECIFIED: &str = "Ikke angivet";

const LABEL_STYLE: &str = "color: #64748b; margin: 5px 0;";
const FOOTER_STYLE: &str = "color: #94a3b8; font-size: 12px;";

/// An email ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    /// Sender, e.g. `Name <address>`.
    pub from: String,
    /// Recipients.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

/// Danish label for the kind of location submitted.
#[must_use]
pub const fn type_label(parking_type: ParkingType) -> &'static str {
    match parking_type {
        ParkingType::LongTerm => "Cykelbutik",
        ParkingType::ShortTerm => "Parkeringsplads",
    }
}

/// Subject line for a submission notification.
#[must_use]
pub fn render_subject(data: &ParkingData) -> String {
    format!("🚗 Ny {} Indsendt: {}", type_label(data.parking_type), data.name)
}

/// Formats a submission time the way Danish locales print it.
#[must_use]
pub fn format_submitted_at(at: DateTime<Utc>) -> String {
    at.format("%-d.%-m.%Y, %H.%M.%S").to_string()
}

/// Escapes text for safe inclusion in HTML content and attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// HTML body for a submission notification.
#[must_use]
pub fn render_html(data: &ParkingData, site_url: &str, submitted_at: DateTime<Utc>) -> String {
    let label = type_label(data.parking_type);
    let name = escape_html(&data.name);
    let address = escape_html(non_blank(data.address.as_deref()).unwrap_or(NO_ADDRESS));

    let mut details = String::new();
    let _ = writeln!(
        details,
        r#"<p style="{LABEL_STYLE}"><strong>Type:</strong> {label}</p>"#
    );
    let _ = writeln!(
        details,
        r#"<p style="{LABEL_STYLE}"><strong>Adresse:</strong> {address}</p>"#
    );
    let _ = writeln!(
        details,
        r#"<p style="{LABEL_STYLE}"><strong>Koordinater:</strong> {}, {}</p>"#,
        data.latitude, data.longitude
    );

    if data.parking_type == ParkingType::ShortTerm {
        let operator = escape_html(non_blank(data.operator.as_deref()).unwrap_or(NOT_SPECIFIED));
        let fees = escape_html(non_blank(data.fee_info.as_deref()).unwrap_or(NOT_SPECIFIED));
        let _ = writeln!(
            details,
            r#"<p style="{LABEL_STYLE}"><strong>Operatør:</strong> {operator}</p>"#
        );
        let _ = writeln!(
            details,
            r#"<p style="{LABEL_STYLE}"><strong>Priser:</strong> {fees}</p>"#
        );
    }

    if let Some(notes) = non_blank(data.notes.as_deref()) {
        let _ = writeln!(
            details,
            r#"<div style="margin-top: 15px;"><strong style="color: #334155;">Noter:</strong><p style="color: #64748b; background: white; padding: 10px; border-radius: 4px; margin: 5px 0;">{}</p></div>"#,
            escape_html(notes)
        );
    }

    let admin_url = escape_html(&format!("{}/admin", site_url.trim_end_matches('/')));
    let submitted = format_submitted_at(submitted_at);

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2 style="color: #1e40af; border-bottom: 2px solid #3b82f6; padding-bottom: 10px;">Ny {label} Indsendt</h2>
<div style="background: #f8fafc; padding: 20px; border-radius: 8px; margin: 20px 0;">
<h3 style="color: #334155; margin-top: 0;">{name}</h3>
{details}</div>
<div style="background: #dbeafe; padding: 15px; border-radius: 8px; margin: 20px 0;">
<p style="margin: 0; color: #1e40af;"><strong>Næste skridt:</strong> Gå til admin panelet for at gennemgå og godkende denne indsendelse.</p>
</div>
<div style="text-align: center; margin: 30px 0;">
<a href="{admin_url}" style="background: #3b82f6; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; display: inline-block;">Gennemgå Indsendelse</a>
</div>
<div style="border-top: 1px solid #e2e8f0; padding-top: 20px; margin-top: 30px;">
<p style="{FOOTER_STYLE} margin: 0;">København Parkering Finder - Automatisk besked</p>
<p style="{FOOTER_STYLE} margin: 5px 0 0 0;">Indsendt: {submitted}</p>
</div>
</div>
"#
    )
}

/// Builds the full notification for one submission.
#[must_use]
pub fn build_notification(
    data: &ParkingData,
    from: &str,
    to: &str,
    site_url: &str,
    submitted_at: DateTime<Utc>,
) -> EmailMessage {
    EmailMessage {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: render_subject(data),
        html: render_html(data, site_url, submitted_at),
    }
}
