//! Configuration for the import CLI, read once at startup.

/// Errors raised while building configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
}

/// Settings the CLI needs to reach the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Postgres connection URL.
    pub database_url: String,
}

impl IngestConfig {
    /// Loads `.env.local` and `.env` if present, then reads the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `DATABASE_URL` is absent or blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self { database_url })
    }
}
