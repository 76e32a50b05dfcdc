use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

const DEFAULT_PROJECT_ID: &str = "nutricionapp-b7b7d";
const DEFAULT_DATABASE: &str = "(default)";
const DEFAULT_COLLECTION: &str = "users";
const DEFAULT_PAGE_SIZE: u32 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Firestore project the roster lives in
    #[serde(default = "default_project_id")]
    pub firestore_project_id: String,
    /// Firestore database id within the project
    #[serde(default = "default_database")]
    pub firestore_database: String,
    /// Collection scanned for the listing
    #[serde(default = "default_collection")]
    pub firestore_collection: String,
    /// Documents requested per page
    #[serde(default = "default_page_size")]
    pub firestore_page_size: u32,
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub firestore_timeout_secs: u64,
    /// `host:port` of a local Firestore emulator; credentials are skipped when set
    #[serde(default)]
    pub firestore_emulator_host: Option<String>,
}

fn default_project_id() -> String {
    DEFAULT_PROJECT_ID.to_owned()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_owned()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_owned()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Read `FIRESTORE_*` settings from the environment, after merging in a `.env`
    /// file when present. Page size is clamped to at least one and a blank
    /// emulator host counts as unset.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config.normalized())
    }

    /// A page size of zero would let the backend pick; keep it explicit
    fn normalized(mut self) -> Self {
        self.firestore_page_size = self.firestore_page_size.max(1);
        self.firestore_emulator_host = self
            .firestore_emulator_host
            .map(|host| host.trim().to_owned())
            .filter(|host| !host.is_empty());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.firestore_timeout_secs.max(1))
    }

    pub fn emulator_host(&self) -> Option<&str> {
        self.firestore_emulator_host.as_deref()
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        envy::from_iter::<_, Config>(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned())),
        )
        .map(Config::normalized)
        .expect("config should deserialize")
    }

    #[test]
    fn defaults_point_at_the_users_collection() {
        let config = from_pairs(&[]);
        assert_eq!(config.firestore_project_id, "nutricionapp-b7b7d");
        assert_eq!(config.firestore_database, "(default)");
        assert_eq!(config.firestore_collection, "users");
        assert_eq!(config.firestore_page_size, 300);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.emulator_host(), None);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = from_pairs(&[
            ("FIRESTORE_PROJECT_ID", "demo-project"),
            ("FIRESTORE_COLLECTION", "patients"),
            ("FIRESTORE_PAGE_SIZE", "25"),
            ("FIRESTORE_EMULATOR_HOST", "localhost:8080"),
        ]);
        assert_eq!(config.firestore_project_id, "demo-project");
        assert_eq!(config.firestore_collection, "patients");
        assert_eq!(config.firestore_page_size, 25);
        assert_eq!(config.emulator_host(), Some("localhost:8080"));
    }

    #[test]
    fn blank_emulator_host_is_ignored() {
        let config = from_pairs(&[("FIRESTORE_EMULATOR_HOST", "  ")]);
        assert_eq!(config.emulator_host(), None);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let config = from_pairs(&[("FIRESTORE_PAGE_SIZE", "0")]);
        assert_eq!(config.firestore_page_size, 1);
    }
}
