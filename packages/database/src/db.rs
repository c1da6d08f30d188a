//! Database connection utilities.

use switchy_database::Database;
use switchy_database_connection::Credentials;

use crate::DbError;

/// Opens a Postgres connection for the given URL.
///
/// Configures a 120-second `statement_timeout` so stalled queries fail with
/// an error instead of hanging indefinitely.
///
/// # Errors
///
/// Returns [`DbError::Connection`] if the URL cannot be parsed or the
/// connection fails.
pub async fn connect(url: &str) -> Result<Box<dyn Database>, DbError> {
    // Strip query parameters (e.g., ?sslmode=require) that the Credentials
    // parser doesn't understand. TLS is handled by the native-tls connector.
    let url_base = url.split('?').next().unwrap_or(url);

    let creds = Credentials::from_url(url_base).map_err(|e| DbError::Connection {
        message: format!("invalid database URL: {e}"),
    })?;
    let db = switchy_database_connection::init_postgres_raw_native_tls(creds)
        .await
        .map_err(|e| DbError::Connection {
            message: e.to_string(),
        })?;

    db.exec_raw("SET statement_timeout = '120s'").await?;

    log::debug!("Connected to {}", redact(url_base));
    Ok(db)
}

/// Hides the password part of a connection URL for logging.
fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((userinfo, host)) => {
            let user = userinfo.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}
