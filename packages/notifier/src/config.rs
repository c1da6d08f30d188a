//! Notifier configuration, read once at startup.

/// Admin address used when `ADMIN_EMAIL` is unset.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

/// Public site used for the admin link when `SITE_URL` is unset.
pub const DEFAULT_SITE_URL: &str = "http://localhost:5173";

/// Sender of every notification.
pub const DEFAULT_FROM_ADDRESS: &str = "Copenhagen Parking <noreply@parkering.dk>";

/// Settings for the notifier service.
#[derive(Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Resend API key. Without it every notification fails with a
    /// configuration error.
    pub resend_api_key: Option<String>,
    /// Recipient of notifications.
    pub admin_email: String,
    /// Base URL of the web app, used for the admin link.
    pub site_url: String,
    /// `From` header of notifications.
    pub from_address: String,
    /// Address to bind the HTTP server to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("resend_api_key", &self.resend_api_key.as_ref().map(|_| "***"))
            .field("admin_email", &self.admin_email)
            .field("site_url", &self.site_url)
            .field("from_address", &self.from_address)
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .finish()
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl NotifierConfig {
    /// Loads `.env.local` and `.env` if present, then reads the process
    /// environment.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Blank values
    /// count as unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            resend_api_key: get("RESEND_API_KEY"),
            admin_email: get("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            site_url: get("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.site_url),
            from_address: get("EMAIL_FROM").unwrap_or(defaults.from_address),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn falls_back_to_defaults() {
        let config = NotifierConfig::from_lookup(lookup(&[]));
        assert_eq!(config, NotifierConfig::default());
        assert_eq!(config.admin_email, "admin@example.com");
        assert_eq!(config.site_url, "http://localhost:5173");
        assert_eq!(config.port, 8080);
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = NotifierConfig::from_lookup(lookup(&[
            ("RESEND_API_KEY", "re_123"),
            ("ADMIN_EMAIL", "moderator@parkering.dk"),
            ("SITE_URL", "https://parkering.dk/"),
            ("PORT", "9000"),
        ]));
        assert_eq!(config.resend_api_key.as_deref(), Some("re_123"));
        assert_eq!(config.admin_email, "moderator@parkering.dk");
        assert_eq!(config.site_url, "https://parkering.dk");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config = NotifierConfig::from_lookup(lookup(&[("RESEND_API_KEY", "")]));
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    fn invalid_port_uses_default() {
        let config = NotifierConfig::from_lookup(lookup(&[("PORT", "http")]));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn debug_hides_api_key() {
        let config = NotifierConfig::from_lookup(lookup(&[("RESEND_API_KEY", "re_secret")]));
        assert!(!format!("{config:?}").contains("re_secret"));
    }
}
