//! Configuration loading for sift
//!
//! OAuth credentials are loaded from (in order of priority):
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON file (Google Cloud Console format)
//! 3. Runtime environment variables (fallback)
//!
//! Runtime settings come from `settings.json`; every key is optional.

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::FailurePolicy;

/// Credentials filename in the sift config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Settings filename in the sift config directory
const SETTINGS_FILE: &str = "settings.json";

const DEFAULT_DATABASE_FILE: &str = "sift.sqlite";
const DEFAULT_RULES_FILE: &str = "rules.json";

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials, trying compile-time values, then
    /// ~/.config/sift/google-credentials.json, then runtime env vars
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Credentials embedded at build time.
    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Desktop apps get "installed", web clients get "web"
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    /// Check if credentials are available from any source
    pub fn is_available() -> bool {
        Self::from_compile_time().is_some()
            || config::config_exists(CREDENTIALS_FILE)
            || (std::env::var("GMAIL_CLIENT_ID").is_ok()
                && std::env::var("GMAIL_CLIENT_SECRET").is_ok())
    }
}

/// Runtime settings read from settings.json
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite file holding records and the ledger
    pub database_path: Option<PathBuf>,
    /// Rules JSON file
    pub rules_path: Option<PathBuf>,
    /// Messages fetched per fetch step
    pub fetch_count: usize,
    /// Bounded wait for every Gmail HTTP call
    pub request_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            rules_path: None,
            fetch_count: 10,
            request_timeout_secs: 30,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl Settings {
    /// Load ~/.config/sift/settings.json, or defaults when it doesn't exist
    pub fn load() -> Result<Self> {
        if !config::config_exists(SETTINGS_FILE) {
            debug!("No {} found, using default settings", SETTINGS_FILE);
            return Ok(Self::default());
        }
        config::load_json(SETTINGS_FILE)
    }

    /// Load settings from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Database path, preferring an explicit override
    pub fn database_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        config::resolve_path(
            explicit.or(self.database_path.as_deref()),
            DEFAULT_DATABASE_FILE,
        )
    }

    /// Rules path, preferring an explicit override
    pub fn rules_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        config::resolve_path(explicit.or(self.rules_path.as_deref()), DEFAULT_RULES_FILE)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
